use crate::context::SkippedCheck;
use crate::error::{Error, Result};
use regex::Regex;

/// Finds inline suppression directives such as
/// `# resgraph:skip=CKV_AWS_20: public bucket is intended`.
#[derive(Debug, Clone)]
pub struct SkipDirectiveScanner {
    regex: Regex,
}

impl SkipDirectiveScanner {
    pub fn new<S: AsRef<str>>(prefixes: &[S]) -> Result<Self> {
        if prefixes.is_empty() {
            return Err(Error::Config(
                "at least one skip directive prefix is required".to_string(),
            ));
        }
        let alternatives: Vec<String> = prefixes
            .iter()
            .map(|p| regex::escape(p.as_ref()))
            .collect();
        let pattern = format!(r"(?:{})\s*([A-Za-z0-9_]+)", alternatives.join("|"));
        let regex = Regex::new(&pattern)
            .map_err(|e| Error::Config(format!("invalid skip directive prefix: {e}")))?;
        Ok(Self { regex })
    }

    /// Scan one line. A line may carry several directives; a reason runs
    /// from the `:` after the check id up to the next directive or line end.
    pub fn scan_line(&self, line: &str) -> Vec<SkippedCheck> {
        let heads: Vec<(usize, usize, &str)> = self
            .regex
            .captures_iter(line)
            .filter_map(|caps| {
                let whole = caps.get(0)?;
                Some((whole.start(), whole.end(), caps.get(1)?.as_str()))
            })
            .collect();

        heads
            .iter()
            .enumerate()
            .map(|(i, &(_, end, id))| {
                let next = heads.get(i + 1).map_or(line.len(), |&(start, _, _)| start);
                let suppress_comment = line[end..next]
                    .strip_prefix(':')
                    .map(str::trim)
                    .filter(|reason| !reason.is_empty())
                    .map(String::from);
                SkippedCheck {
                    id: id.to_string(),
                    suppress_comment,
                }
            })
            .collect()
    }

    pub fn scan<'a, I>(&self, lines: I) -> Vec<SkippedCheck>
    where
        I: IntoIterator<Item = &'a str>,
    {
        lines
            .into_iter()
            .flat_map(|line| self.scan_line(line))
            .collect()
    }
}

impl Default for SkipDirectiveScanner {
    fn default() -> Self {
        Self::new(&[crate::config::DEFAULT_SKIP_DIRECTIVE]).expect("default skip directive compiles")
    }
}
