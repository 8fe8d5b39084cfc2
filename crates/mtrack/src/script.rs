//! Marker script parsing.
//!
//! A script lists methods and the markers of each body in order:
//!
//! ```text
//! # comment
//! method <name> <id>
//!   entry timed sampler=Const mean=10 level=[0,5]
//!   test timed
//!   duration
//! ```
//!
//! Tags are whitespace separated, either `key` or `key=value`. Level
//! expressions therefore must not contain spaces.

use std::fs;
use std::path::Path;

use mtrack_expand::{Marker, MarkerKind, parse_method_id};
use tracing::debug;

use crate::error::{Error, Result};
use crate::instrument::MethodBody;

const METHOD_KEYWORD: &str = "method";

/// Parse a marker script.
pub fn parse_script(src: &str) -> Result<Vec<MethodBody>> {
    let mut methods: Vec<MethodBody> = Vec::new();

    for (idx, raw) in src.lines().enumerate() {
        let line_no = idx + 1;
        let line = raw.split_once('#').map_or(raw, |(code, _)| code).trim();
        let mut words = line.split_whitespace();
        let Some(head) = words.next() else {
            continue;
        };

        if head == METHOD_KEYWORD {
            methods.push(parse_method_header(words, line_no)?);
            continue;
        }

        let kind: MarkerKind = head
            .parse()
            .map_err(|e: String| Error::script(line_no, e))?;
        let Some(method) = methods.last_mut() else {
            return Err(Error::script(
                line_no,
                format!("marker `{head}` before any method"),
            ));
        };
        method.markers.push(parse_tags(Marker::new(kind), words));
    }

    debug!(methods = methods.len(), "parsed script");
    Ok(methods)
}

/// Read and parse a marker script file.
pub fn load_script(path: &Path) -> Result<Vec<MethodBody>> {
    let src = fs::read_to_string(path)?;
    parse_script(&src)
}

fn parse_method_header<'a>(
    mut words: impl Iterator<Item = &'a str>,
    line_no: usize,
) -> Result<MethodBody> {
    let (Some(name), Some(id), None) = (words.next(), words.next(), words.next()) else {
        return Err(Error::script(line_no, "expected `method <name> <id>`"));
    };
    let method_id = parse_method_id(id)
        .map_err(|_| Error::script(line_no, format!("invalid method id {id:?}")))?;
    Ok(MethodBody::new(name, method_id))
}

fn parse_tags<'a>(marker: Marker, words: impl Iterator<Item = &'a str>) -> Marker {
    words.fold(marker, |marker, word| match word.split_once('=') {
        Some((key, value)) => marker.with_tag(key, value),
        None => marker.with_flag(word),
    })
}
