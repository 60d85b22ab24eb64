//! Procedural macros for the weave component runtime.
//!
//! - `#[derive(Interfaces)]` — generates `IInterface::get_interface`'s
//!   dispatch table and a `&'static ClassInfo` from field-level
//!   `#[member(...)]` attributes.
//! - `weave_plugin!(expr)` — emits the shared-library ABI entrypoint
//!   that turns `expr` (anything implementing `weave_runtime::plugin::
//!   Plugin`) into the ABI's well-known exported symbol.

mod interfaces;
mod plugin;

use proc_macro::TokenStream;
use syn::{parse_macro_input, DeriveInput};

/// See the crate-level docs. Struct attribute: `#[interfaces(IAny, ...)]`
/// naming the core interfaces this class implements by hand. Field
/// attribute: `#[member(property|event|function)]` to contribute that
/// field to the class's static member list.
#[proc_macro_derive(Interfaces, attributes(interfaces, member))]
pub fn derive_interfaces(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    interfaces::expand(&input)
        .unwrap_or_else(|e| e.to_compile_error())
        .into()
}

/// Emits the plugin shared-library ABI entrypoint. Usage:
///
/// ```rust,ignore
/// weave_plugin!(CounterPlugin::new());
/// ```
#[proc_macro]
pub fn weave_plugin(input: TokenStream) -> TokenStream {
    plugin::expand(input.into())
        .unwrap_or_else(|e| e.to_compile_error())
        .into()
}
