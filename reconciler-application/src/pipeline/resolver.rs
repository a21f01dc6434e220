use std::collections::{BTreeSet, HashMap};

use futures_util::future::join_all;
use reconciler_domain::{
    is_valid_login, normalize_login, DirectoryUser, ExternalAccount, FailureReason,
    IdentityDirectory,
};
use tracing::{debug, warn};

/// Outcome of resolving a set of logins. A login in neither map was looked up
/// successfully but is unknown to the directory.
#[derive(Debug, Clone, Default)]
pub struct Resolution {
    pub accounts: HashMap<String, ExternalAccount>,
    pub failures: HashMap<String, FailureReason>,
}

impl Resolution {
    pub fn account(&self, login: &str) -> Option<&ExternalAccount> {
        self.accounts.get(login)
    }

    pub fn failure(&self, login: &str) -> Option<FailureReason> {
        self.failures.get(login).copied()
    }

    fn merge(&mut self, chunk: ChunkOutcome) {
        for account in chunk.accounts {
            self.accounts
                .entry(account.login_name.clone())
                .or_insert(account);
        }
        for (login, reason) in chunk.failures {
            if !self.accounts.contains_key(&login) {
                self.failures.entry(login).or_insert(reason);
            }
        }
    }
}

#[derive(Debug, Default)]
struct ChunkOutcome {
    accounts: Vec<ExternalAccount>,
    failures: Vec<(String, FailureReason)>,
}

pub struct IdentityResolver<'a> {
    directory: &'a dyn IdentityDirectory,
    batch_size: usize,
}

impl<'a> IdentityResolver<'a> {
    pub fn new(directory: &'a dyn IdentityDirectory, batch_size: usize) -> Self {
        Self {
            directory,
            batch_size: batch_size.max(1),
        }
    }

    pub async fn resolve<I>(&self, logins: I) -> Resolution
    where
        I: IntoIterator<Item = String>,
    {
        let mut resolution = Resolution::default();
        let mut valid = BTreeSet::new();
        for login in logins {
            let login = normalize_login(&login);
            if is_valid_login(&login) {
                valid.insert(login);
            } else {
                debug!(login = %login, "not submitting invalid login");
                resolution.failures.insert(login, FailureReason::InvalidName);
            }
        }

        let valid: Vec<String> = valid.into_iter().collect();
        let outcomes = join_all(
            valid
                .chunks(self.batch_size)
                .map(|chunk| self.resolve_chunk(chunk)),
        )
        .await;

        for outcome in outcomes {
            resolution.merge(outcome);
        }
        resolution
    }

    async fn resolve_chunk(&self, chunk: &[String]) -> ChunkOutcome {
        match self.directory.lookup_users(chunk).await {
            Ok(users) => ChunkOutcome {
                accounts: requested_accounts(chunk, users),
                failures: Vec::new(),
            },
            Err(err) => {
                warn!(
                    logins = chunk.len(),
                    error = %err,
                    "batched identity lookup failed, falling back to single lookups"
                );
                self.resolve_individually(chunk).await
            }
        }
    }

    async fn resolve_individually(&self, chunk: &[String]) -> ChunkOutcome {
        let results = join_all(chunk.iter().map(|login| async move {
            let result = self
                .directory
                .lookup_users(std::slice::from_ref(login))
                .await;
            (login, result)
        }))
        .await;

        let mut outcome = ChunkOutcome::default();
        for (login, result) in results {
            match result {
                Ok(users) => outcome
                    .accounts
                    .extend(requested_accounts(std::slice::from_ref(login), users)),
                Err(err) => {
                    warn!(login = %login, error = %err, "identity lookup failed");
                    outcome
                        .failures
                        .push((login.clone(), FailureReason::LookupFailure));
                }
            }
        }
        outcome
    }
}

fn requested_accounts(requested: &[String], users: Vec<DirectoryUser>) -> Vec<ExternalAccount> {
    users
        .into_iter()
        .map(ExternalAccount::from)
        .filter(|account| requested.contains(&account.login_name))
        .collect()
}
