//! Template matching for subjects, actions and resources
//!
//! A template is a literal string with optional bound segments enclosed in a
//! start/end delimiter pair. Bound segments are raw regular expressions,
//! everything else is matched literally, and the whole template must match
//! the whole candidate:
//!
//! - `articles:1` - only `articles:1`
//! - `users:<.*>` - `users:alice`, `users:bob`, `users:`
//! - `<create|delete>` - `create` or `delete`

use super::cache::PatternCache;
use crate::error::PatternError;
use regex::Regex;

/// Compile a template into an anchored regular expression
///
/// # Examples
/// ```
/// use warden::iam::compile;
///
/// let re = compile("users:<[a-z]+>", '<', '>').unwrap();
/// assert!(re.is_match("users:alice"));
/// assert!(!re.is_match("users:alice:admin"));
/// assert!(compile("users:<.*", '<', '>').is_err());
/// ```
pub fn compile(template: &str, start: char, end: char) -> Result<Regex, PatternError> {
    let spans = bound_spans(template, start, end)?;

    let mut pattern = String::with_capacity(template.len() + 2 * spans.len() + 2);
    pattern.push('^');

    let mut literal_from = 0;
    for &(open, close) in &spans {
        // `open` and `close` point at the delimiters themselves
        let inner = &template[open + start.len_utf8()..close];

        Regex::new(&format!("^{}$", inner)).map_err(|source| {
            PatternError::InvalidExpression {
                template: template.to_string(),
                source,
            }
        })?;

        pattern.push_str(&regex::escape(&template[literal_from..open]));
        pattern.push('(');
        pattern.push_str(inner);
        pattern.push(')');
        literal_from = close + end.len_utf8();
    }
    pattern.push_str(&regex::escape(&template[literal_from..]));
    pattern.push('$');

    Regex::new(&pattern).map_err(|source| PatternError::InvalidExpression {
        template: template.to_string(),
        source,
    })
}

/// Locate outermost delimiter pairs as (start byte offset, end byte offset)
fn bound_spans(template: &str, start: char, end: char) -> Result<Vec<(usize, usize)>, PatternError> {
    let unbalanced = || PatternError::Unbalanced {
        template: template.to_string(),
        start,
        end,
    };

    let mut spans = Vec::new();
    let mut depth: usize = 0;
    let mut open = 0;

    for (idx, ch) in template.char_indices() {
        if ch == start {
            if depth == 0 {
                open = idx;
            }
            depth += 1;
        } else if ch == end {
            depth = depth.checked_sub(1).ok_or_else(unbalanced)?;
            if depth == 0 {
                spans.push((open, idx));
            }
        }
    }

    if depth != 0 {
        return Err(unbalanced());
    }

    Ok(spans)
}

/// Matches candidates against templates, optionally memoizing compiled templates
pub struct PatternMatcher {
    cache: Option<PatternCache>,
}

impl PatternMatcher {
    /// Create a matcher with a compiled-pattern cache of the given capacity
    ///
    /// A capacity of zero disables caching.
    pub fn new(cache_capacity: usize) -> Self {
        PatternMatcher {
            cache: PatternCache::with_capacity(cache_capacity),
        }
    }

    /// Create a matcher that compiles every template on use
    pub fn uncached() -> Self {
        PatternMatcher { cache: None }
    }

    /// Check if `candidate` matches `template` in full
    ///
    /// # Examples
    /// ```
    /// use warden::iam::PatternMatcher;
    ///
    /// let matcher = PatternMatcher::uncached();
    /// assert!(matcher.matches("users:<.*>", "users:alice", '<', '>').unwrap());
    /// assert!(!matcher.matches("a", "ab", '<', '>').unwrap());
    /// ```
    pub fn matches(
        &self,
        template: &str,
        candidate: &str,
        start: char,
        end: char,
    ) -> Result<bool, PatternError> {
        // No delimiters: the escaped, anchored regex is plain equality
        if !template.contains(start) && !template.contains(end) {
            return Ok(template == candidate);
        }

        let regex = match &self.cache {
            Some(cache) => cache.get_or_compile(template, start, end)?,
            None => compile(template, start, end)?,
        };

        Ok(regex.is_match(candidate))
    }

    /// Check if `candidate` matches any of `templates`
    ///
    /// Stops at the first match; an empty list never matches.
    pub fn match_any<S: AsRef<str>>(
        &self,
        templates: &[S],
        candidate: &str,
        start: char,
        end: char,
    ) -> Result<bool, PatternError> {
        for template in templates {
            if self.matches(template.as_ref(), candidate, start, end)? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Drop all cached compiled templates
    pub fn clear_cache(&self) {
        if let Some(cache) = &self.cache {
            cache.clear();
        }
    }

    /// Number of cached compiled templates
    pub fn cache_size(&self) -> usize {
        self.cache.as_ref().map_or(0, |cache| cache.len())
    }
}

impl Default for PatternMatcher {
    fn default() -> Self {
        Self::new(1000)
    }
}
