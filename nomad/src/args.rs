//! Argument and node validation
//!
//! Works on the raw positional tokens. An arity mismatch is reported but only
//! fails when a required value is missing; extra tokens are ignored.

use tracing::error;

use libpopcorn::NodeId;

use crate::error::ArgError;

const ROUNDTRIP_USAGE: &str = "Source Node ID, Sink Node ID";
const STRESS_USAGE: &str = "Source Node ID, Sink Node ID, # of threads";

/// Validated arguments of the single-thread test
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoundTripArgs {
    pub source: NodeId,
    pub sink: NodeId,
}

/// Validated arguments of the multi-thread test
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StressArgs {
    pub source: NodeId,
    pub sink: NodeId,
    pub threads: usize,
}

/// Validate `<source_nid> <sink_nid>`
pub fn parse_roundtrip(tokens: &[String]) -> Result<RoundTripArgs, ArgError> {
    check_arity(tokens, 2, ROUNDTRIP_USAGE)?;
    let (source, sink) = validate_nodes(parse_int(&tokens[0])?, parse_int(&tokens[1])?)?;
    Ok(RoundTripArgs { source, sink })
}

/// Validate `<source_nid> <sink_nid> <thread_count>`
pub fn parse_stress(tokens: &[String], max_threads: usize) -> Result<StressArgs, ArgError> {
    check_arity(tokens, 3, STRESS_USAGE)?;
    let (source, sink) = validate_nodes(parse_int(&tokens[0])?, parse_int(&tokens[1])?)?;

    let threads = parse_int(&tokens[2])?;
    if threads < 1 || threads > max_threads as i64 {
        return Err(ArgError::ThreadCount {
            got: threads,
            max: max_threads,
        });
    }

    Ok(StressArgs {
        source,
        sink,
        threads: threads as usize,
    })
}

/// Source and sink must differ and both lie in `[0, MAX_NODES)`
pub fn validate_nodes(source: i64, sink: i64) -> Result<(NodeId, NodeId), ArgError> {
    if source == sink {
        return Err(ArgError::EqualNodes(source));
    }

    let source = NodeId::new(source).map_err(|e| ArgError::NodeRange(e.0))?;
    let sink = NodeId::new(sink).map_err(|e| ArgError::NodeRange(e.0))?;
    Ok((source, sink))
}

fn check_arity(tokens: &[String], expected: usize, usage: &'static str) -> Result<(), ArgError> {
    if tokens.len() == expected {
        return Ok(());
    }

    let err = ArgError::InvalidArgCount {
        expected,
        got: tokens.len(),
        usage,
    };
    if tokens.len() < expected {
        return Err(err);
    }

    error!(check = "arguments", "{}", err);
    Ok(())
}

fn parse_int(token: &str) -> Result<i64, ArgError> {
    token
        .trim()
        .parse()
        .map_err(|_| ArgError::NotANumber(token.to_string()))
}
