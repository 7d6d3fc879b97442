//! Secondary link reformatting
//!
//! Secondary links carry their article coordinates in the query string
//! (`?date=2024-05-01&page=3&id=77`). Those are rewritten into the short
//! path form `/article/2024-05-01/3/77` on the same host. Anything that
//! does not fit passes through unchanged.

use feedlink_core::MatchingConfig;
use tracing::warn;
use url::Url;

const PAGE_KEYS: &[&str] = &["page", "pg"];
const ID_KEYS: &[&str] = &["id", "article_id"];

/// Outcome of reformatting one link
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormattedLink {
    pub link: String,
    pub reformatted: bool,
}

impl FormattedLink {
    fn unchanged(link: &str) -> Self {
        Self {
            link: link.to_string(),
            reformatted: false,
        }
    }
}

/// Rewrite a secondary link into its canonical short form when it fits the template
///
/// A rewrite that would no longer pass the secondary domain filter is discarded.
pub fn reformat_link(link: &str, config: &MatchingConfig) -> FormattedLink {
    let Some(short) = canonical_form(link) else {
        warn!(link, "Secondary link does not fit the article template, keeping it");
        return FormattedLink::unchanged(link);
    };

    if !config.is_secondary_link(&short) {
        warn!(link, rewritten = %short, "Rewritten link fails the domain filter, keeping original");
        return FormattedLink::unchanged(link);
    }

    FormattedLink {
        link: short,
        reformatted: true,
    }
}

fn canonical_form(link: &str) -> Option<String> {
    let url = Url::parse(link.trim()).ok()?;
    let host = url.host_str()?;

    let param = |keys: &[&str]| {
        url.query_pairs()
            .find(|(key, value)| keys.contains(&&**key) && !value.trim().is_empty())
            .map(|(_, value)| value.trim().to_string())
    };
    let date = param(&["date"])?;
    let page = param(PAGE_KEYS)?;
    let id = param(ID_KEYS)?;

    let authority = match url.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_string(),
    };
    Some(format!(
        "{}://{}/article/{}/{}/{}",
        url.scheme(),
        authority,
        date,
        page,
        id
    ))
}
