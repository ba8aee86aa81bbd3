//! Status helper enums mapping to SMALLINT status columns.
//!
//! Each enum variant's discriminant matches the value stored in the
//! database (and, for node statuses, the `node_statuses` seed rows).

/// Status ID type matching SMALLINT in the database.
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
    /// Content tree node lifecycle. Deleted nodes keep their rows.
    NodeStatus {
        Active = 1,
        Deleted = 2,
    }
}

define_status_enum! {
    /// Completion ledger row state.
    CompletionStatus {
        /// Previously complete, since invalidated.
        Inactive = 0,
        Complete = 1,
    }
}
