use proc_macro::TokenStream;
use quote::quote;
use syn::{DeriveInput, parse_macro_input};

mod attrs;

use attrs::{field_key, is_value_field, parse_field_attrs};

/// Derive macro for the `MultiValue` trait.
///
/// Every named field becomes one key/value pair, keyed by the field name.
/// Adding the struct to a `ValueStorage` flattens these pairs into it.
///
/// # Example
///
/// ```ignore
/// use value_storage_core::Values;
///
/// #[derive(Values)]
/// struct Endpoint {
///     host: String,
///     #[values(rename = "tcp-port")]
///     port: u16,
///     #[values(skip)]
///     token: String,
/// }
/// ```
///
/// # Attributes
///
/// - `#[values(skip)]` - Leave this field out
/// - `#[values(rename = "key")]` - Use a custom key
///
/// Fields must implement `Clone` and `Into<Value>`. An `Option` field that is
/// `None` yields `Null`, which the storage skips.
#[proc_macro_derive(Values, attributes(values))]
pub fn derive_values(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    match derive_values_impl(&input) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

fn derive_values_impl(input: &DeriveInput) -> syn::Result<proc_macro2::TokenStream> {
    let name = &input.ident;
    let (impl_generics, ty_generics, _) = input.generics.split_for_impl();
    let where_clause = build_where_clause(&input.generics);

    let fields = match &input.data {
        syn::Data::Struct(syn::DataStruct {
            fields: syn::Fields::Named(named),
            ..
        }) => &named.named,
        _ => {
            return Err(syn::Error::new_spanned(
                input,
                "Values can only be derived for structs with named fields",
            ));
        }
    };

    let mut inserts = Vec::new();
    for field in fields {
        let attrs = parse_field_attrs(&field.attrs)?;
        if attrs.skip {
            continue;
        }
        let Some(ident) = field.ident.as_ref() else {
            continue;
        };
        let key = field_key(field, &attrs).unwrap_or_default();
        inserts.push(quote! {
            values.insert(
                ::std::string::String::from(#key),
                ::std::convert::Into::<::value_storage_core::Value>::into(
                    ::std::clone::Clone::clone(&self.#ident),
                ),
            );
        });
    }

    Ok(quote! {
        impl #impl_generics ::value_storage_core::MultiValue for #name #ty_generics #where_clause {
            fn values(
                &self,
            ) -> ::value_storage_core::IndexMap<::std::string::String, ::value_storage_core::Value> {
                let mut values = ::value_storage_core::IndexMap::new();
                #(#inserts)*
                values
            }
        }
    })
}

/// Derive macro for the `SingleValue` trait.
///
/// Works on a struct with exactly one field, or on a struct where exactly one
/// field is marked `#[value]`. Resolution returns a clone of that field.
///
/// ```ignore
/// use value_storage_core::SingleValue;
///
/// #[derive(SingleValue)]
/// struct Celsius(f64);
///
/// #[derive(SingleValue)]
/// struct Reading {
///     #[value]
///     celsius: f64,
///     sensor: String,
/// }
/// ```
#[proc_macro_derive(SingleValue, attributes(value))]
pub fn derive_single_value(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    match derive_single_value_impl(&input) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

fn derive_single_value_impl(input: &DeriveInput) -> syn::Result<proc_macro2::TokenStream> {
    let name = &input.ident;
    let (impl_generics, ty_generics, _) = input.generics.split_for_impl();
    let where_clause = build_where_clause(&input.generics);

    let fields = match &input.data {
        syn::Data::Struct(data) => &data.fields,
        _ => {
            return Err(syn::Error::new_spanned(
                input,
                "SingleValue can only be derived for structs",
            ));
        }
    };

    let mut marked = Vec::new();
    for (i, field) in fields.iter().enumerate() {
        if is_value_field(field)? {
            marked.push((i, field));
        }
    }

    let (index, field) = match marked.as_slice() {
        [only] => *only,
        [] => {
            let mut iter = fields.iter().enumerate();
            match (iter.next(), iter.next()) {
                (Some(only), None) => only,
                _ => {
                    return Err(syn::Error::new_spanned(
                        input,
                        "mark exactly one field with #[value]",
                    ));
                }
            }
        }
        [_, second, ..] => {
            return Err(syn::Error::new_spanned(
                second.1,
                "only one field may be marked #[value]",
            ));
        }
    };

    let accessor = match &field.ident {
        Some(ident) => quote! { self.#ident },
        None => {
            let idx = syn::Index::from(index);
            quote! { self.#idx }
        }
    };

    Ok(quote! {
        impl #impl_generics ::value_storage_core::SingleValue for #name #ty_generics #where_clause {
            fn value(
                &self,
            ) -> ::std::result::Result<::value_storage_core::Value, ::value_storage_core::BoxError> {
                ::std::result::Result::Ok(::std::convert::Into::<::value_storage_core::Value>::into(
                    ::std::clone::Clone::clone(&#accessor),
                ))
            }
        }
    })
}

/// Extends the item's where clause with value bounds for every type parameter.
fn build_where_clause(generics: &syn::Generics) -> Option<syn::WhereClause> {
    let mut generics = generics.clone();
    let type_params: Vec<syn::Ident> = generics.type_params().map(|p| p.ident.clone()).collect();

    if !type_params.is_empty() {
        let where_clause = generics.make_where_clause();
        for param in type_params {
            where_clause.predicates.push(syn::parse_quote! {
                #param: ::std::clone::Clone
                    + ::std::convert::Into<::value_storage_core::Value>
                    + ::std::marker::Send
                    + ::std::marker::Sync
                    + 'static
            });
        }
    }

    generics.where_clause
}
