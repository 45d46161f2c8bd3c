// Caption and hashtag resolution.

pub const DEFAULT_CAPTION: &str = "Thanks for watching, hit follow for more! 🙏";
pub const DEFAULT_HASHTAGS: &str = "#reels #instareels #trending #viral #foryou #fyp #repost";

/// Caption text and hashtag line that end up on the published post.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caption {
    pub text: String,
    /// `None` when the user opted out of hashtags entirely.
    pub hashtags: Option<String>,
}

impl Caption {
    /// Resolve user-provided values against the defaults. Blank or missing
    /// values fall back to the defaults.
    pub fn resolve(custom_caption: Option<&str>, custom_hashtags: Option<&str>) -> Caption {
        let text = non_blank(custom_caption)
            .map(str::to_string)
            .unwrap_or_else(|| DEFAULT_CAPTION.to_string());
        let hashtags = non_blank(custom_hashtags)
            .map(normalize_hashtags)
            .unwrap_or_else(|| DEFAULT_HASHTAGS.to_string());
        Caption {
            text,
            hashtags: Some(hashtags),
        }
    }

    /// Drop the hashtag line.
    pub fn without_hashtags(mut self) -> Caption {
        self.hashtags = None;
        self
    }

    pub fn uses_default_text(&self) -> bool {
        self.text == DEFAULT_CAPTION
    }

    /// The full caption as posted: text, blank line, hashtags.
    pub fn full(&self) -> String {
        match &self.hashtags {
            Some(tags) => format!("{}\n\n{}", self.text, tags),
            None => self.text.clone(),
        }
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Prefix `#` to every whitespace-separated token missing one, unless the
/// string already starts with `#`, in which case it is kept as written.
pub fn normalize_hashtags(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.starts_with('#') {
        return trimmed.to_string();
    }
    trimmed
        .split_whitespace()
        .map(|word| {
            if word.starts_with('#') {
                word.to_string()
            } else {
                format!("#{}", word)
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
