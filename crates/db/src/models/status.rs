//! Status helper enums mapping to SMALLSERIAL/SMALLINT lookup tables.
//!
//! Each enum variant's discriminant matches the seed data order (1-based)
//! in the corresponding `*_statuses` table from migration 0001.

/// Status ID type matching SMALLINT/SMALLSERIAL in the database.
pub type StatusId = i16;

macro_rules! define_status_enum {
    (
        $(#[$meta:meta])*
        $name:ident {
            $( $(#[$vmeta:meta])* $variant:ident = $val:expr ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[repr(i16)]
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        pub enum $name {
            $( $(#[$vmeta])* $variant = $val ),+
        }

        impl $name {
            /// Return the database status ID.
            pub fn id(self) -> StatusId {
                self as StatusId
            }
        }

        impl From<$name> for StatusId {
            fn from(value: $name) -> Self {
                value as StatusId
            }
        }
    };
}

define_status_enum! {
    /// Queued work-order lifecycle.
    JobStatus {
        Queued = 1,
        Running = 2,
        Done = 3,
        Failed = 4,
    }
}

define_status_enum! {
    /// Bulk-run lifecycle.
    RunStatus {
        Running = 1,
        Done = 2,
        Failed = 3,
    }
}

define_status_enum! {
    /// Trouble-ledger entry lifecycle.
    TroubleStatus {
        Open = 1,
        Queued = 2,
        Resolved = 3,
    }
}

impl TroubleStatus {
    /// Parse the status name used in query strings.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "open" => Some(TroubleStatus::Open),
            "queued" => Some(TroubleStatus::Queued),
            "resolved" => Some(TroubleStatus::Resolved),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn job_status_ids_match_seed_data() {
        assert_eq!(JobStatus::Queued.id(), 1);
        assert_eq!(JobStatus::Running.id(), 2);
        assert_eq!(JobStatus::Done.id(), 3);
        assert_eq!(JobStatus::Failed.id(), 4);
    }

    #[test]
    fn run_status_ids_match_seed_data() {
        assert_eq!(RunStatus::Running.id(), 1);
        assert_eq!(RunStatus::Done.id(), 2);
        assert_eq!(RunStatus::Failed.id(), 3);
    }

    #[test]
    fn trouble_status_ids_match_seed_data() {
        assert_eq!(TroubleStatus::Open.id(), 1);
        assert_eq!(TroubleStatus::Queued.id(), 2);
        assert_eq!(TroubleStatus::Resolved.id(), 3);
    }

    #[test]
    fn trouble_status_parses_query_names() {
        assert_eq!(TroubleStatus::from_name("open"), Some(TroubleStatus::Open));
        assert_eq!(
            TroubleStatus::from_name("resolved"),
            Some(TroubleStatus::Resolved)
        );
        assert_eq!(TroubleStatus::from_name("bogus"), None);
    }

    #[test]
    fn status_into_status_id() {
        let id: StatusId = JobStatus::Queued.into();
        assert_eq!(id, 1);
    }
}
