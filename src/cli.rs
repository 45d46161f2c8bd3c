use clap::Parser;

use crate::source::Source;

#[derive(Parser, Debug)]
#[command(name = "insta-repost", version, about = "Repost Instagram Reels and YouTube Shorts to Instagram")]
pub struct CliArgs {
    /// Instagram reel or YouTube shorts URL to repost. Prompted for when
    /// omitted in a terminal.
    pub url: Option<String>,

    /// Custom caption for the repost
    #[arg(long)]
    pub caption: Option<String>,

    /// Custom hashtags; words without a leading `#` get one
    #[arg(long)]
    pub hashtags: Option<String>,

    /// Source platform; detected from the URL when omitted
    #[arg(long, value_enum)]
    pub source: Option<Source>,

    /// Post the caption without any hashtags
    #[arg(long, default_value_t = false, conflicts_with = "hashtags")]
    pub no_hashtags: bool,

    /// Enable debug logging
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_invocation() {
        let args = CliArgs::parse_from([
            "insta-repost",
            "https://youtube.com/shorts/abc",
            "--caption",
            "hi",
            "--hashtags",
            "a b",
            "--source",
            "youtube",
        ]);
        assert_eq!(args.url.as_deref(), Some("https://youtube.com/shorts/abc"));
        assert_eq!(args.source, Some(Source::Youtube));
        assert_eq!(args.hashtags.as_deref(), Some("a b"));
        assert!(!args.no_hashtags);
    }

    #[test]
    fn url_is_optional() {
        let args = CliArgs::parse_from(["insta-repost"]);
        assert!(args.url.is_none());
        assert!(args.source.is_none());
    }

    #[test]
    fn rejects_unknown_source() {
        assert!(CliArgs::try_parse_from(["insta-repost", "u", "--source", "tiktok"]).is_err());
    }
}
