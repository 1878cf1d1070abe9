// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Testbench Developers

//! Declarative macros shared by the session crates.
//!
//! - [`simple_display!`] maps enum variants to their canonical wire names
//! - [`setters!`] generates chained setters for builder structs

/// Generate a `Display` impl that maps enum variants to string literals.
///
/// Unit variants match directly; data-carrying variants use `(..)` to ignore fields.
///
/// ```ignore
/// crate::simple_display! {
///     Outcome {
///         Pass => "pass",
///         Fail => "fail",
///     }
/// }
/// ```
#[macro_export]
macro_rules! simple_display {
    ($enum:ty { $( $variant:ident $(( $($ignore:tt)* ))? => $str:expr ),+ $(,)? }) => {
        impl std::fmt::Display for $enum {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(match self {
                    $( Self::$variant $(( $($ignore)* ))? => $str, )+
                })
            }
        }
    };
}

/// Generate setter methods inside an existing `impl` block.
///
/// - `set { field: Type }` takes `Type` directly
/// - `option { field: Type }` stores `Some(v.into())` into an `Option<Type>` field
///
/// ```ignore
/// impl JobDefinitionBuilder {
///     tb_core::setters! {
///         set { origin: JobOrigin }
///         option { depends: String }
///     }
/// }
/// ```
#[macro_export]
macro_rules! setters {
    (
        $(set {
            $( $set_field:ident : $set_ty:ty ),* $(,)?
        })?
        $(option {
            $( $opt_field:ident : $opt_ty:ty ),* $(,)?
        })?
    ) => {
        $($(
            pub fn $set_field(mut self, v: $set_ty) -> Self {
                self.$set_field = v;
                self
            }
        )*)?

        $($(
            pub fn $opt_field(mut self, v: impl Into<$opt_ty>) -> Self {
                self.$opt_field = Some(v.into());
                self
            }
        )*)?
    };
}
