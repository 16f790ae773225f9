//! Pagination over the search endpoint for one domain.
//!
//! Walks pages backwards through the timeline using `max_id` until the
//! API has nothing older to return, the per-domain ceiling is reached,
//! or a request fails. Collected posts survive a mid-walk failure.

use tracing::{debug, info, warn};

use crate::client::TwitterApi;
use crate::types::Post;

/// Hard ceiling on posts fetched for one domain in one run.
pub const MAX_POSTS_PER_DOMAIN: usize = 10_000_000;

/// Fetch every available post mentioning `domain`, newest first.
///
/// With `single_page` set only the first page is requested, whatever it
/// contains. Request failures are logged and end the walk; whatever was
/// collected up to that point is returned.
pub async fn search_domain(api: &TwitterApi, domain: &str, single_page: bool) -> Vec<Post> {
    info!(domain = %domain, single_page, "searching posts for domain");

    let mut collected: Vec<Post> = Vec::new();
    // Cursor sentinel: anything <= 0 means "no upper bound yet".
    let mut max_id: i64 = -1;
    // Reserved for incremental search; never set today.
    let since_id: Option<i64> = None;

    while collected.len() < MAX_POSTS_PER_DOMAIN {
        let upper = (max_id > 0).then(|| max_id - 1);

        let page = match api.search_page(domain, upper, since_id).await {
            Ok(page) => page,
            Err(err) => {
                warn!(
                    domain = %domain,
                    collected = collected.len(),
                    error = %err,
                    "search failed; keeping what was collected"
                );
                return collected;
            }
        };

        let page_len = page.statuses.len();
        let mut last_id = None;
        for status in page.statuses {
            match Post::from_status(status) {
                Ok(post) => {
                    last_id = Some(post.id);
                    collected.push(post);
                }
                Err(err) => {
                    warn!(domain = %domain, error = %err, "skipping malformed status");
                }
            }
        }

        debug!(
            domain = %domain,
            page_len,
            total = collected.len(),
            "downloading posts"
        );

        if single_page {
            break;
        }
        if page_len == 0 {
            debug!(domain = %domain, "no more posts found");
            break;
        }
        match last_id {
            Some(id) => max_id = id,
            // Nothing on the page parsed, so there is no id to move the
            // cursor past; requesting again would fetch this page forever.
            None => break,
        }
    }

    info!(domain = %domain, total = collected.len(), "domain search finished");
    collected
}
