use crate::eligibility::is_blacklisted;
use crate::executor::ActionExecutor;
use crate::site::SocialSite;
use crate::upvotes::UpvoteService;
use crate::RunSummary;
use echopost_core::{ActionOutcome, CoreError, SkipReason};
use ledger::Ledger;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info, warn};

/// Knobs for the crosspost loop; one parameterized loop instead of a
/// family of near-identical drivers.
#[derive(Debug, Clone)]
pub struct CrosspostOptions {
    pub check_target_metadata: bool,
    pub delay: Duration,
    pub blacklist: Vec<String>,
}

/// Crossposts one fixed source submission into an ordered list of targets,
/// recording every success so later runs never repeat it.
pub struct CrosspostRunner<'a, S: SocialSite, U: UpvoteService> {
    site: &'a mut S,
    ledger: &'a mut Ledger,
    executor: ActionExecutor,
    upvotes: Option<&'a U>,
    options: CrosspostOptions,
}

impl<'a, S: SocialSite, U: UpvoteService> CrosspostRunner<'a, S, U> {
    pub fn new(
        site: &'a mut S,
        ledger: &'a mut Ledger,
        executor: ActionExecutor,
        upvotes: Option<&'a U>,
        options: CrosspostOptions,
    ) -> Self {
        Self {
            site,
            ledger,
            executor,
            upvotes,
            options,
        }
    }

    /// Resolving the source submission is the only fatal step; every
    /// per-target problem is logged and the loop moves on.
    pub async fn run(
        &mut self,
        source_url: &str,
        targets: &[String],
    ) -> Result<RunSummary, CoreError> {
        let source = self.site.submission_from_url(source_url).await?;
        info!(
            "Crossposting {:?} ({}) to {} targets",
            source.title,
            source.fullname(),
            targets.len()
        );

        let mut summary = RunSummary::default();
        for target in targets {
            if self.ledger.contains(target) {
                debug!("Skipping r/{}: {:?}", target, SkipReason::AlreadyActedOn);
                summary.skipped += 1;
                continue;
            }
            if is_blacklisted(target, &self.options.blacklist) {
                debug!("Skipping r/{}: {:?}", target, SkipReason::Blacklisted);
                summary.skipped += 1;
                continue;
            }
            if self.options.check_target_metadata {
                match self.site.target_info(target).await {
                    Ok(metadata) if !metadata.is_open() => {
                        info!("Skipping r/{}: {:?}", target, SkipReason::TargetNotOpen);
                        summary.skipped += 1;
                        continue;
                    }
                    Ok(_) => {}
                    Err(e) => {
                        // Not recorded, so an unreachable target is retried
                        // on the next run
                        warn!(
                            "Skipping r/{}: {:?}: {}",
                            target,
                            SkipReason::TargetUnreachable,
                            e
                        );
                        summary.skipped += 1;
                        continue;
                    }
                }
            }

            summary.attempted += 1;
            match self.executor.crosspost(self.site, &source, target).await {
                ActionOutcome::Success { url } => {
                    summary.succeeded += 1;
                    self.ledger.record(target);
                    if let (Some(upvotes), Some(url)) = (self.upvotes, url.as_deref()) {
                        if let Err(e) = upvotes.order_upvotes(url).await {
                            warn!("Upvote order failed (ignored): {}", e);
                        }
                    }
                }
                ActionOutcome::Skipped(reason) => {
                    info!("Skipped r/{}: {:?}", target, reason);
                    summary.skipped += 1;
                }
                ActionOutcome::Failed(kind) => {
                    warn!("Crosspost to r/{} failed: {:?}", target, kind);
                    summary.failed += 1;
                }
            }

            sleep(self.options.delay).await;
        }

        info!("Crosspost run finished: {:?}", summary);
        Ok(summary)
    }
}
