/*
 * Responsibility
 * - What the repo layer tells callers about failures
 */
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RepoError {
    #[error("conflict")]
    Conflict,
}
