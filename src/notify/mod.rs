//! Run notification channel.
//!
//! The reporter renders a [`JobSummary`](crate::types::summary::JobSummary)
//! into an [`OutgoingEmail`] and hands it to a [`Notifier`]. Delivery errors
//! are returned to the reporter, which logs and drops them.

use anyhow::Result;
use async_trait::async_trait;
use dyn_clone::DynClone;

pub mod ses;

pub use ses::SesNotifier;

/// Type alias for a boxed notifier trait object.
pub type Notifier = Box<dyn NotifierTrait + Send + Sync>;

/// One rendered notification message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingEmail {
    pub from: String,
    pub to: Vec<String>,
    pub subject: String,
    pub html_body: String,
    pub text_body: String,
}

#[async_trait]
pub trait NotifierTrait: DynClone {
    async fn send(&self, email: &OutgoingEmail) -> Result<()>;
}

dyn_clone::clone_trait_object!(NotifierTrait);
