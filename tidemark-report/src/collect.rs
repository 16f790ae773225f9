//! Flattening search results into tabular rows.

use tidemark_twitter::{search_domain, TwitterApi};
use tracing::debug;

use crate::table::Table;

/// Column layout of the raw collected dataset.
pub const RAW_COLUMNS: [&str; 4] = ["domain", "raw_id", "created_at", "json_str"];

/// Search every domain in order and flatten the matches into one table.
///
/// Rows keep the API's per-domain ordering, domains appear in input
/// order, and nothing is deduplicated: a domain listed twice is searched
/// twice and contributes two batches of rows. When no domain matches
/// anything the result still carries the full header row.
pub async fn collect_posts(api: &TwitterApi, domains: &[String], single_page: bool) -> Table {
    let mut table = Table::new(RAW_COLUMNS.iter().map(|c| c.to_string()).collect());

    for domain in domains {
        let posts = search_domain(api, domain, single_page).await;
        debug!(domain = %domain, rows = posts.len(), "flattened posts into rows");
        for post in posts {
            table.rows.push(vec![
                domain.clone(),
                post.id.to_string(),
                post.created_at.to_rfc3339(),
                post.raw_json(),
            ]);
        }
    }

    table
}
