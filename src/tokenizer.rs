//! Line classification for partitioner logs.
//!
//! Every line of a log is one of: a graph boundary marker, a metric-bearing
//! line, or noise. Partitioners interleave banners, warnings and progress
//! output with the lines we care about, so anything that does not match is
//! reported as `Token::NoMatch` and never as an error. A sample line whose
//! numeric capture does not parse is noise too.

use crate::series::{MetricKind, Sample};
use regex::Regex;

/// Classification of a single log line.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// Start of a new graph block; carries the normalized graph identifier.
    GraphMarker(String),
    /// A count-valued sample (edge-cut, edge weight sum).
    MetricSample { kind: MetricKind, value: Sample },
    /// Per-level timing sample.
    PhaseTimeSample { level: u32, millis: f64 },
    NoMatch,
}

/// How the sample pattern's captures are read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleShape {
    /// `value` is an unsigned integer.
    Count,
    /// `level` is the coarsening level, `value` a duration in milliseconds.
    LevelMillis,
}

/// Compiled marker and sample patterns for one log grammar.
///
/// The marker pattern must define a `path` group spanning the path-like text
/// that precedes the `.graph` extension. The sample pattern must define a
/// `value` group, plus a `level` group for `SampleShape::LevelMillis`.
#[derive(Debug)]
pub struct PatternSet {
    marker: Regex,
    sample: Regex,
    kind: MetricKind,
    shape: SampleShape,
    suffix: Option<Regex>,
}

impl PatternSet {
    pub fn new(
        marker: &str,
        sample: &str,
        kind: MetricKind,
        shape: SampleShape,
    ) -> Result<Self, regex::Error> {
        Ok(Self {
            marker: Regex::new(marker)?,
            sample: Regex::new(sample)?,
            kind,
            shape,
            suffix: None,
        })
    }

    /// Strip a tool-specific tag (e.g. `_gpu_1024`) from identifiers.
    pub fn with_suffix(mut self, suffix: &str) -> Result<Self, regex::Error> {
        self.suffix = Some(Regex::new(suffix)?);
        Ok(self)
    }

    pub fn kind(&self) -> MetricKind {
        self.kind
    }

    fn identifier(&self, path_like: &str) -> Option<String> {
        graph_identifier(path_like, self.suffix.as_ref())
    }
}

/// Normalize a path-like string into a graph identifier.
///
/// Takes the last segment after either slash style, trims it and removes
/// the optional suffix tag. Returns `None` when nothing is left.
pub fn graph_identifier(path_like: &str, suffix: Option<&Regex>) -> Option<String> {
    let segment = path_like
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(path_like)
        .trim();
    let segment = segment.strip_suffix(".graph").unwrap_or(segment);
    let id = match suffix {
        Some(re) => re.replace(segment, "").into_owned(),
        None => segment.to_string(),
    };
    if id.is_empty() {
        None
    } else {
        Some(id)
    }
}

/// Classify one line. A marker takes precedence over a sample on the same line.
pub fn tokenize(line: &str, patterns: &PatternSet) -> Token {
    if let Some(id) = patterns
        .marker
        .captures(line)
        .and_then(|caps| caps.name("path").and_then(|p| patterns.identifier(p.as_str())))
    {
        return Token::GraphMarker(id);
    }

    let Some(caps) = patterns.sample.captures(line) else {
        return Token::NoMatch;
    };
    let value = caps.name("value").map(|m| m.as_str());

    match patterns.shape {
        SampleShape::Count => match value.and_then(|v| v.parse::<u64>().ok()) {
            Some(v) => Token::MetricSample {
                kind: patterns.kind,
                value: Sample::Int(v),
            },
            None => Token::NoMatch,
        },
        SampleShape::LevelMillis => {
            let level = caps.name("level").and_then(|l| l.as_str().parse::<u32>().ok());
            let millis = value.and_then(|v| v.parse::<f64>().ok());
            match (level, millis) {
                (Some(level), Some(millis)) if millis.is_finite() => {
                    Token::PhaseTimeSample { level, millis }
                }
                _ => Token::NoMatch,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cut_patterns() -> PatternSet {
        PatternSet::new(
            r"graph:\s*(?P<path>.+?)\.graph",
            r"level\s+(?P<level>\d+):.*adjwgtsum\s+(?P<value>\d+)",
            MetricKind::EdgeCut,
            SampleShape::Count,
        )
        .unwrap()
    }

    fn time_patterns() -> PatternSet {
        PatternSet::new(
            r"graph:\s*(?P<path>.+?)\.graph",
            r"level=\s*(?P<level>\d+)\s+time=\s*(?P<value>[\d.]+)\s*ms",
            MetricKind::PhaseTime,
            SampleShape::LevelMillis,
        )
        .unwrap()
    }

    #[test]
    fn marker_with_forward_slashes() {
        let t = tokenize("graph: /data/foo.graph", &cut_patterns());
        assert_eq!(t, Token::GraphMarker("foo".into()));
    }

    #[test]
    fn marker_with_backslashes() {
        let t = tokenize(r"graph: C:\bench\sets\road_usa.graph", &cut_patterns());
        assert_eq!(t, Token::GraphMarker("road_usa".into()));
    }

    #[test]
    fn marker_without_directory() {
        let t = tokenize("graph: cage15.graph k=8", &cut_patterns());
        assert_eq!(t, Token::GraphMarker("cage15".into()));
    }

    #[test]
    fn marker_strips_suffix_tag() {
        let p = cut_patterns().with_suffix(r"_(?:gpu|cpu)_\d+$").unwrap();
        let t = tokenize("graph: /g/wb-edu_gpu_1024.graph", &p);
        assert_eq!(t, Token::GraphMarker("wb-edu".into()));
    }

    #[test]
    fn count_sample() {
        let t = tokenize("level 3: nvtxs 100 adjwgtsum 4242", &cut_patterns());
        assert_eq!(
            t,
            Token::MetricSample {
                kind: MetricKind::EdgeCut,
                value: Sample::Int(4242)
            }
        );
    }

    #[test]
    fn level_time_sample() {
        let t = tokenize("  level= 2 time= 12.5 ms", &time_patterns());
        assert_eq!(
            t,
            Token::PhaseTimeSample {
                level: 2,
                millis: 12.5
            }
        );
    }

    #[test]
    fn unparseable_number_is_no_match() {
        let t = tokenize("level= 2 time= 1.2.3 ms", &time_patterns());
        assert_eq!(t, Token::NoMatch);
    }

    #[test]
    fn banner_lines_are_no_match() {
        let p = cut_patterns();
        assert_eq!(tokenize("", &p), Token::NoMatch);
        assert_eq!(tokenize("WARNING: imbalance 1.03", &p), Token::NoMatch);
        assert_eq!(tokenize("=== Partitioner v2 ===", &p), Token::NoMatch);
    }

    #[test]
    fn identifier_rejects_empty_segment() {
        assert_eq!(graph_identifier("/data/", None), None);
        assert_eq!(graph_identifier("  ", None), None);
    }
}
