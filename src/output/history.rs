//! Markdown rendering of an article's change history
//!
//! The current article text comes first, followed by every archived version,
//! newest first.

use crate::storage::{ArticleRecord, ArticleVersionRecord, Storage};
use crate::Result;

/// An article together with its archived versions, newest first
#[derive(Debug, Clone)]
pub struct ArticleHistory {
    pub article: ArticleRecord,
    pub versions: Vec<ArticleVersionRecord>,
}

/// Loads the history of the article stored under `url`
///
/// # Returns
///
/// * `Ok(Some(ArticleHistory))` - The article exists
/// * `Ok(None)` - No article has been stored for this URL
pub fn load_history(storage: &dyn Storage, url: &str) -> Result<Option<ArticleHistory>> {
    let Some(article) = storage.get_article_by_url(url)? else {
        return Ok(None);
    };
    let versions = storage.get_versions(article.id)?;

    Ok(Some(ArticleHistory { article, versions }))
}

/// Formats an article history as markdown
///
/// # Arguments
///
/// * `history` - The article and its versions
///
/// # Returns
///
/// A formatted markdown string
pub fn format_history_markdown(history: &ArticleHistory) -> String {
    let article = &history.article;
    let mut md = String::new();

    md.push_str(&format!("# {}\n\n", article.headline));
    if !article.sub_headline.is_empty() {
        md.push_str(&format!("_{}_\n\n", article.sub_headline));
    }

    md.push_str(&format!("- **URL**: {}\n", article.url));
    md.push_str(&format!("- **First crawled**: {}\n", article.first_crawled_at));
    md.push_str(&format!("- **Last crawled**: {}\n", article.last_crawled_at));
    if let Some(updated_at) = article.updated_at {
        md.push_str(&format!("- **Updated on page**: {}\n", updated_at));
    }
    md.push_str(&format!("- **Versions**: {}\n\n", history.versions.len()));

    md.push_str("## Current\n\n");
    md.push_str(&article.content);
    md.push_str("\n\n");

    for (index, version) in history.versions.iter().enumerate() {
        md.push_str(&format!(
            "## Version {} (current until {})\n\n",
            history.versions.len() - index,
            version.crawled_at
        ));
        if version.headline != article.headline {
            md.push_str(&format!("**{}**\n\n", version.headline));
        }
        if !version.sub_headline.is_empty() && version.sub_headline != article.sub_headline {
            md.push_str(&format!("_{}_\n\n", version.sub_headline));
        }
        md.push_str(&version.content);
        md.push_str("\n\n");
    }

    md
}
