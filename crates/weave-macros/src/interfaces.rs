//! `#[derive(Interfaces)]` implementation.

use proc_macro2::TokenStream;
use quote::quote;
use syn::{
    parse::{Parse, ParseStream},
    punctuated::Punctuated,
    Data, DeriveInput, Fields, Ident, Token,
};

// ─── known interfaces ────────────────────────────────────────────────────────

/// One entry of the fixed, closed interface set `InterfaceRef` covers.
/// Adding a new core interface means adding a row here and a matching
/// variant to `weave_core::interface::InterfaceRef`.
struct KnownInterface {
    attr_name: &'static str,
    trait_path: TokenStream,
    variant: Ident,
}

fn known_interfaces() -> Vec<KnownInterface> {
    let core = quote! { ::weave_core };
    vec![
        KnownInterface {
            attr_name: "IAny",
            trait_path: quote! { #core::any::IAny },
            variant: Ident::new("Any", proc_macro2::Span::call_site()),
        },
        KnownInterface {
            attr_name: "IFunction",
            trait_path: quote! { #core::function::IFunction },
            variant: Ident::new("Function", proc_macro2::Span::call_site()),
        },
        KnownInterface {
            attr_name: "IEvent",
            trait_path: quote! { #core::event::IEvent },
            variant: Ident::new("Event", proc_macro2::Span::call_site()),
        },
        KnownInterface {
            attr_name: "IProperty",
            trait_path: quote! { #core::property::IProperty },
            variant: Ident::new("Property", proc_macro2::Span::call_site()),
        },
        KnownInterface {
            attr_name: "IExternalChange",
            trait_path: quote! { #core::any::IExternalChange },
            variant: Ident::new("ExternalChange", proc_macro2::Span::call_site()),
        },
        KnownInterface {
            attr_name: "IMetadata",
            trait_path: quote! { #core::metadata::IMetadata },
            variant: Ident::new("Metadata", proc_macro2::Span::call_site()),
        },
    ]
}

// ─── struct attribute: #[interfaces(IAny, IMetadata)] ────────────────────────

struct InterfaceList(Vec<Ident>);

impl Parse for InterfaceList {
    fn parse(input: ParseStream) -> syn::Result<Self> {
        let idents: Punctuated<Ident, Token![,]> = Punctuated::parse_terminated(input)?;
        Ok(InterfaceList(idents.into_iter().collect()))
    }
}

// ─── field attribute: #[member(property|event|function)] ────────────────────

#[derive(Clone, Copy, PartialEq, Eq)]
enum MemberKind {
    Property,
    Event,
    Function,
}

struct MemberField {
    name: String,
    kind: MemberKind,
    ty: syn::Type,
}

fn parse_member_attr(field: &syn::Field) -> syn::Result<Option<MemberKind>> {
    for attr in &field.attrs {
        if !attr.path().is_ident("member") {
            continue;
        }
        let kind_ident: Ident = attr.parse_args()?;
        let kind = match kind_ident.to_string().as_str() {
            "property" => MemberKind::Property,
            "event" => MemberKind::Event,
            "function" => MemberKind::Function,
            other => {
                return Err(syn::Error::new_spanned(
                    kind_ident,
                    format!("unknown member kind `{other}`; expected property, event, or function"),
                ))
            }
        };
        return Ok(Some(kind));
    }
    Ok(None)
}

fn collect_members(data: &Data) -> syn::Result<Vec<MemberField>> {
    let Data::Struct(data_struct) = data else {
        return Ok(Vec::new());
    };
    let Fields::Named(named) = &data_struct.fields else {
        return Ok(Vec::new());
    };
    let mut members = Vec::new();
    for field in &named.named {
        if let Some(kind) = parse_member_attr(field)? {
            let name = field
                .ident
                .as_ref()
                .expect("named field")
                .to_string();
            members.push(MemberField {
                name,
                kind,
                ty: field.ty.clone(),
            });
        }
    }
    Ok(members)
}

// ─── expansion ────────────────────────────────────────────────────────────────

pub fn expand(input: &DeriveInput) -> syn::Result<TokenStream> {
    let ident = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();
    let core = quote! { ::weave_core };

    let list_attr = input
        .attrs
        .iter()
        .find(|a| a.path().is_ident("interfaces"));
    let requested: Vec<Ident> = match list_attr {
        Some(attr) => attr.parse_args::<InterfaceList>()?.0,
        None => Vec::new(),
    };

    let known = known_interfaces();
    let mut arms = Vec::new();
    for name in &requested {
        let entry = known
            .iter()
            .find(|k| name == k.attr_name)
            .ok_or_else(|| {
                syn::Error::new_spanned(
                    name,
                    format!(
                        "unknown interface `{name}`; expected one of: {}",
                        known
                            .iter()
                            .map(|k| k.attr_name)
                            .collect::<Vec<_>>()
                            .join(", ")
                    ),
                )
            })?;
        let trait_path = &entry.trait_path;
        let variant = &entry.variant;
        arms.push(quote! {
            if uid == <dyn #trait_path as #core::interface::InterfaceId>::UID {
                return ::std::option::Option::Some(#core::interface::InterfaceRef::#variant(self));
            }
        });
    }

    let members = collect_members(&input.data)?;
    let member_entries = members.iter().map(|m| {
        let name = &m.name;
        let ty = &m.ty;
        let kind = match m.kind {
            MemberKind::Property => quote! { #core::types::MemberKind::Property },
            MemberKind::Event => quote! { #core::types::MemberKind::Event },
            MemberKind::Function => quote! { #core::types::MemberKind::Function },
        };
        quote! {
            #core::types::MemberDesc {
                kind: #kind,
                name: #name,
                type_uid: #core::uid::type_uid::<#ty>(),
            }
        }
    });

    let class_info_ident = quote::format_ident!("__WEAVE_CLASS_INFO_{}", ident);

    Ok(quote! {
        static #class_info_ident: #core::types::ClassInfo = #core::types::ClassInfo {
            class_uid: #core::uid::type_uid::<#ident #ty_generics>(),
            name: stringify!(#ident),
            members: &[ #( #member_entries ),* ],
        };

        impl #impl_generics #core::interface::IInterface for #ident #ty_generics #where_clause {
            fn class_uid(&self) -> #core::uid::Uid {
                #core::uid::type_uid::<Self>()
            }

            fn get_interface(&self, uid: #core::uid::Uid) -> ::std::option::Option<#core::interface::InterfaceRef<'_>> {
                #( #arms )*
                ::std::option::Option::None
            }
        }

        impl #impl_generics #ident #ty_generics #where_clause {
            /// The static member table assembled from this struct's
            /// `#[member(...)]`-annotated fields.
            pub fn class_info() -> &'static #core::types::ClassInfo {
                &#class_info_ident
            }
        }
    })
}
