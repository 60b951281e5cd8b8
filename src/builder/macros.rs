//! Macros for ergonomic event definitions.

/// Generate an `Event` implementation for an enum.
///
/// Each variant's kind is its name. Variants may carry tuple payloads.
///
/// # Example
///
/// ```
/// use canopy::core::Event;
/// use canopy::event_enum;
///
/// event_enum! {
///     pub enum PlayerEvent {
///         Play,
///         Pause,
///         Seek(u64),
///     }
/// }
///
/// assert_eq!(PlayerEvent::Seek(30).kind(), "Seek");
/// ```
#[macro_export]
macro_rules! event_enum {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $(
                $(#[$variant_meta:meta])*
                $variant:ident $( ( $($field:ty),* $(,)? ) )?
            ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Clone, Debug)]
        $vis enum $name {
            $(
                $(#[$variant_meta])*
                $variant $( ( $($field),* ) )?
            ),*
        }

        impl $crate::core::Event for $name {
            fn kind(&self) -> &str {
                match self {
                    $(Self::$variant { .. } => stringify!($variant)),*
                }
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use crate::core::Event;

    event_enum! {
        enum TestEvent {
            Toggle,
            Reset,
            Set(u32),
            Move(i32, i32),
        }
    }

    #[test]
    fn event_enum_macro_generates_trait() {
        assert_eq!(TestEvent::Toggle.kind(), "Toggle");
        assert_eq!(TestEvent::Reset.kind(), "Reset");
        assert_eq!(TestEvent::Set(3).kind(), "Set");
        assert_eq!(TestEvent::Move(1, -1).kind(), "Move");
    }

    #[test]
    fn event_enum_supports_visibility_and_attributes() {
        event_enum! {
            #[derive(PartialEq)]
            pub enum PublicEvent {
                A,
                B(String),
            }
        }

        assert_eq!(PublicEvent::B("x".into()), PublicEvent::B("x".into()));
        assert_eq!(PublicEvent::A.kind(), "A");
    }
}
