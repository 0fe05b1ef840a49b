use futures::stream::{self, StreamExt, TryStreamExt};
use tracing::{debug, info, info_span, instrument, Instrument};

use crate::error::ApiError;
use crate::github::{PullRequestDetail, PullRequestSource};

/// List the open pull requests of `owner/repo`, each with its commit count.
///
/// Commit listings run concurrently, at most `max_concurrency` at a time.
/// Output keeps the upstream listing order. The first failure fails the
/// whole call and drops any listings still in flight.
#[instrument(skip(source))]
pub async fn open_pull_request_details(
    source: &dyn PullRequestSource,
    owner: &str,
    repo: &str,
    max_concurrency: usize,
) -> Result<Vec<PullRequestDetail>, ApiError> {
    let pulls = source.list_open_pull_requests(owner, repo).await?;
    info!(open = pulls.len(), "fetched open pull requests");

    let mut indexed: Vec<(usize, PullRequestDetail)> = stream::iter(pulls.into_iter().enumerate())
        .map(|(index, pr)| async move {
            let commits = source
                .list_pull_request_commits(owner, repo, pr.number)
                .instrument(info_span!("count_commits", pr = pr.number))
                .await?;
            debug!(pr = pr.number, commits = commits.len(), "counted commits");
            Ok::<_, ApiError>((index, PullRequestDetail::new(pr, commits.len())))
        })
        .buffer_unordered(max_concurrency.max(1))
        .try_collect()
        .await?;

    // Listings complete in any order; restore the upstream one.
    indexed.sort_unstable_by_key(|(index, _)| *index);
    Ok(indexed.into_iter().map(|(_, detail)| detail).collect())
}
