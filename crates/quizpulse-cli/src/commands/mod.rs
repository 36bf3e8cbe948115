pub mod init;
pub mod report;
pub mod rescore;
pub mod score;
pub mod validate;
pub mod weeks;

use anyhow::Result;

use quizpulse_core::model::AttemptRecord;
use quizpulse_core::parser::learners;

/// Pick the learner to report on.
///
/// Explicit flags win; otherwise the store must hold exactly one learner
/// matching whatever was given.
pub(crate) fn resolve_learner(
    records: &[AttemptRecord],
    account: Option<String>,
    child: Option<String>,
) -> Result<(String, String)> {
    if let (Some(account), Some(child)) = (&account, &child) {
        return Ok((account.clone(), child.clone()));
    }

    let candidates: Vec<(String, String)> = learners(records)
        .into_iter()
        .filter(|(a, _)| account.as_ref().map_or(true, |want| want == a))
        .filter(|(_, c)| child.as_ref().map_or(true, |want| want == c))
        .collect();

    match candidates.as_slice() {
        [only] => Ok(only.clone()),
        [] => match (account, child) {
            // Nothing stored for them yet; still report (empty).
            (Some(account), None) => Ok((account, "0".to_string())),
            _ => anyhow::bail!("no attempts found; pass --account and --child"),
        },
        many => {
            let names: Vec<String> = many.iter().map(|(a, c)| format!("{a}/{c}")).collect();
            anyhow::bail!(
                "attempts belong to several learners ({}); pass --account and --child",
                names.join(", ")
            )
        }
    }
}
