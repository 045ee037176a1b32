use std::str::FromStr;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::lifecycle::Lifecycle;
use crate::error::{Result, StorageError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Draft,
    Pending,
    Paid,
    Rejected,
    Refunded,
}

impl PaymentStatus {
    pub const ALL: [PaymentStatus; 5] = [
        Self::Draft,
        Self::Pending,
        Self::Paid,
        Self::Rejected,
        Self::Refunded,
    ];
}

impl Lifecycle for PaymentStatus {
    const KIND: &'static str = "payment status";

    fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Pending => "pending",
            Self::Paid => "paid",
            Self::Rejected => "rejected",
            Self::Refunded => "refunded",
        }
    }

    fn valid_transitions(&self) -> &'static [Self] {
        match self {
            Self::Draft => &[Self::Pending],
            Self::Pending => &[Self::Paid, Self::Rejected],
            Self::Paid => &[Self::Refunded],
            Self::Rejected => &[Self::Pending],
            Self::Refunded => &[],
        }
    }
}

impl FromStr for PaymentStatus {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| StorageError::Validation(format!("unknown payment status '{s}'")))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum EntryStatus {
    Draft,
    Entered,
    Locked,
}

impl EntryStatus {
    pub const ALL: [EntryStatus; 3] = [Self::Draft, Self::Entered, Self::Locked];

    /// Statuses whose teams appear on leaderboards.
    pub const RANKED: [EntryStatus; 2] = [Self::Entered, Self::Locked];
}

impl Lifecycle for EntryStatus {
    const KIND: &'static str = "entry status";

    fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Entered => "entered",
            Self::Locked => "locked",
        }
    }

    fn valid_transitions(&self) -> &'static [Self] {
        match self {
            Self::Draft => &[Self::Entered],
            Self::Entered => &[Self::Locked],
            Self::Locked => &[],
        }
    }
}

impl FromStr for EntryStatus {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| StorageError::Validation(format!("unknown entry status '{s}'")))
    }
}

/// A contest entry together with its ordered roster.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Team {
    pub team_id: Uuid,
    pub owner_id: Uuid,
    pub season_year: i32,
    pub name: String,
    pub payment_status: PaymentStatus,
    pub entry_status: EntryStatus,
    pub locked_at: Option<NaiveDateTime>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
    pub deleted_at: Option<NaiveDateTime>,
    /// Roster in the order the owner picked it.
    pub player_ids: Vec<Uuid>,
}

impl Team {
    pub fn is_locked(&self) -> bool {
        self.entry_status == EntryStatus::Locked
    }

    /// Name and roster may only change before the entry is locked.
    pub fn ensure_editable(&self) -> Result<()> {
        if self.is_locked() {
            return Err(StorageError::InvalidState(format!(
                "team '{}' is locked; roster and name can no longer change",
                self.name
            )));
        }
        Ok(())
    }

    pub fn next_payment_status(&self, next: PaymentStatus) -> Result<PaymentStatus> {
        self.payment_status.transition_to(next)
    }

    /// Entry moves are gated on payment: only paid teams may enter the contest.
    pub fn next_entry_status(&self, next: EntryStatus) -> Result<EntryStatus> {
        let next = self.entry_status.transition_to(next)?;

        if next == EntryStatus::Entered && self.payment_status != PaymentStatus::Paid {
            return Err(StorageError::Validation(format!(
                "team cannot enter the contest while payment status is '{}'; payment must be 'paid'",
                self.payment_status.as_str()
            )));
        }

        Ok(next)
    }
}
