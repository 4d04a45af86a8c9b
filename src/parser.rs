//! Normalization of untrusted model output into a list of items
//!
//! Models are told to answer with `{"results": [...]}` but routinely
//! wrap it in reasoning traces, code fences or prose, or ignore the
//! format entirely. Cleanup runs as an ordered list of passes, then
//! extraction tries progressively looser strategies. Parsing never
//! fails: bad input degrades to a partial or empty list.

use log::{debug, trace};
use std::sync::LazyLock;
use regex::Regex;
use serde_json::Value;

use crate::config::ParserConfig;

static REASONING_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
  Regex::new(r"(?is)<think(?:ing)?>.*?</think(?:ing)?>")
    .expect("valid reasoning block regex")
});

// Opening tag dropped by the provider: everything up to the close is reasoning
static REASONING_PREFIX: LazyLock<Regex> = LazyLock::new(|| {
  Regex::new(r"(?is)^.*</think(?:ing)?>")
    .expect("valid reasoning prefix regex")
});

// Truncated reasoning that never closed
static REASONING_UNCLOSED: LazyLock<Regex> = LazyLock::new(|| {
  Regex::new(r"(?is)<think(?:ing)?>.*$")
    .expect("valid unclosed reasoning regex")
});

// A language tag is only legal on a fence that sits on its own line
static CODE_FENCE_LINE: LazyLock<Regex> = LazyLock::new(|| {
  Regex::new(r"(?m)^[ \t]*```[A-Za-z0-9_-]*[ \t\r]*$")
    .expect("valid code fence regex")
});

static LIST_PREFIX: LazyLock<Regex> = LazyLock::new(|| {
  Regex::new(r"^(?:\d+[.)]\s+|[-*•·]\s+)+")
    .expect("valid list prefix regex")
});

const META_PREFIXES: [&str; 13] = [
  "here is"
, "here are"
, "here's"
, "result"
, "note:"
, "note -"
, "sorry"
, "i'm sorry"
, "i am sorry"
, "i apologize"
, "apologies"
, "as an ai"
, "sure,"
];

/// One cleanup step applied to the raw text before extraction
pub trait NormalizePass: Send + Sync
{   fn name(&self) -> &'static str;
    fn apply(&self, text: &str) -> String;
}

/// Removes `<think>...</think>` style reasoning traces
#[derive(Debug, Clone, Copy, Default)]
pub struct StripReasoning;

impl NormalizePass for StripReasoning
{   fn name(&self) -> &'static str
    {   "strip_reasoning"
    }

    fn apply(&self, text: &str) -> String
    {   let text = REASONING_BLOCK.replace_all(text, "");
        let text = REASONING_PREFIX.replace(&text, "");
        REASONING_UNCLOSED.replace(&text, "").trim().to_string()
    }
}

/// Removes markdown code fence markers, tagged or not
#[derive(Debug, Clone, Copy, Default)]
pub struct StripCodeFences;

impl NormalizePass for StripCodeFences
{   fn name(&self) -> &'static str
    {   "strip_code_fences"
    }

    fn apply(&self, text: &str) -> String
    {   CODE_FENCE_LINE.replace_all(text, "")
          .replace("```", "")
          .trim()
          .to_string()
    }
}

/// Response parser; holds no per-call state
pub struct ResponseParser
{   passes: Vec<Box<dyn NormalizePass>>
  , config: ParserConfig
}

impl Default for ResponseParser
{   fn default() -> Self
    {   ResponseParser::new(ParserConfig::default())
    }
}

impl ResponseParser
{   /// Parser with the standard passes: reasoning first, then fences
    pub fn new(config: ParserConfig) -> Self
    {   ResponseParser
        {   passes: vec![
              Box::new(StripReasoning)
            , Box::new(StripCodeFences)
            ]
          , config
        }
    }

    /// Append a provider-specific cleanup pass
    pub fn with_pass(mut self, pass: impl NormalizePass + 'static) -> Self
    {   self.passes.push(Box::new(pass));
        self
    }

    /// Run every normalization pass in order
    pub fn normalize(&self, raw: &str) -> String
    {   self.passes.iter().fold(raw.trim().to_string(), |text, pass| {
          let next = pass.apply(&text);
          trace!("Parser pass {}: {} -> {} chars",
            pass.name(), text.len(), next.len());
          next
        })
    }

    /// Extract items from a raw provider response
    pub fn parse(&self, raw: &str) -> Vec<String>
    {   let text = self.normalize(raw);
        if text.is_empty()
        {   debug!("Parser: nothing left after normalization");
            return vec![];
        }

        if let Some(items) = self.from_object_slice(&text)
        {   debug!("Parser: {} items from results object", items.len());
            return items;
        }
        if let Some(items) = self.from_bare_array(&text)
        {   debug!("Parser: {} items from bare array", items.len());
            return items;
        }
        if let Some(items) = self.from_array_slice(&text)
        {   debug!("Parser: {} items from array slice", items.len());
            return items;
        }

        let items = self.from_lines(&text);
        debug!("Parser: {} items from line split", items.len());
        items
    }

    /// Outermost `{...}` holding a `results` array
    fn from_object_slice(&self, text: &str) -> Option<Vec<String>>
    {   let start = text.find('{')?;
        let end = text.rfind('}')?;
        if end <= start
        {   return None;
        }
        let value: Value = serde_json::from_str(&text[start..=end]).ok()?;
        match value.get("results")
        {   Some(Value::Array(items)) => self.non_empty(self.strings(items))
          , _ => None
        }
    }

    /// Whole text is a JSON array
    fn from_bare_array(&self, text: &str) -> Option<Vec<String>>
    {   match serde_json::from_str::<Value>(text).ok()?
        {   Value::Array(items) => self.non_empty(self.strings(&items))
          , _ => None
        }
    }

    /// Outermost `[...]` somewhere in the text
    fn from_array_slice(&self, text: &str) -> Option<Vec<String>>
    {   let start = text.find('[')?;
        let end = text.rfind(']')?;
        if end <= start
        {   return None;
        }
        self.from_bare_array(&text[start..=end])
    }

    fn strings(&self, items: &[Value]) -> Vec<String>
    {   items.iter()
          .filter_map(Value::as_str)
          .map(str::trim)
          .filter(|s| s.chars().count() >= self.config.min_item_chars.max(1))
          .map(str::to_string)
          .collect()
    }

    fn non_empty(&self, items: Vec<String>) -> Option<Vec<String>>
    {   if items.is_empty()
        {   None
        } else
        {   Some(items)
        }
    }

    /// Last resort for plain prose: one item per usable line
    fn from_lines(&self, text: &str) -> Vec<String>
    {   text.lines()
          .filter_map(clean_line)
          .filter(|l| l.chars().count() >= self.config.min_line_chars)
          .take(self.config.max_fallback_items)
          .collect()
    }
}

/// Strip list markers, wrapping quotes and JSON-ish trailing commas.
/// Returns `None` for lines that are structure or commentary.
fn clean_line(line: &str) -> Option<String>
{   let line = line.trim();
    if line.contains('{') || line.contains('}') || line.contains("```")
    {   return None;
    }
    let line = LIST_PREFIX.replace(line, "");
    let lowered = line.trim_start_matches(['"', '\'', '*', ' '])
      .to_lowercase();
    if META_PREFIXES.iter().any(|p| lowered.starts_with(p))
    {   return None;
    }

    let line = line.trim().trim_end_matches([',', ';']).trim();
    let line = strip_wrapping_quotes(line).trim();
    if line.is_empty()
    {   return None;
    }
    Some(line.to_string())
}

fn strip_wrapping_quotes(line: &str) -> &str
{   for (open, close) in [('"', '"'), ('\'', '\''), ('“', '”')]
    {   if let Some(inner) = line
          .strip_prefix(open)
          .and_then(|l| l.strip_suffix(close))
        {   return inner;
        }
    }
    line
}
