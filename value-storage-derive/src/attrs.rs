use syn::ext::IdentExt;
use syn::{Attribute, Field, LitStr};

/// Options from `#[values(...)]` on a field.
#[derive(Default)]
pub(crate) struct FieldAttrs {
    pub skip: bool,
    pub rename: Option<String>,
}

pub(crate) fn parse_field_attrs(attrs: &[Attribute]) -> syn::Result<FieldAttrs> {
    let mut result = FieldAttrs::default();

    for attr in attrs {
        if !attr.path().is_ident("values") {
            continue;
        }

        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("skip") {
                result.skip = true;
                Ok(())
            } else if meta.path.is_ident("rename") {
                let value: LitStr = meta.value()?.parse()?;
                if value.value().is_empty() {
                    return Err(syn::Error::new_spanned(value, "rename key must not be empty"));
                }
                result.rename = Some(value.value());
                Ok(())
            } else {
                Err(meta.error("expected `skip` or `rename = \"...\"`"))
            }
        })?;
    }

    Ok(result)
}

/// Returns the storage key for a named field.
pub(crate) fn field_key(field: &Field, attrs: &FieldAttrs) -> Option<String> {
    attrs
        .rename
        .clone()
        .or_else(|| field.ident.as_ref().map(|ident| ident.unraw().to_string()))
}

/// Returns true if the field carries a bare `#[value]` marker.
pub(crate) fn is_value_field(field: &Field) -> syn::Result<bool> {
    let mut marked = false;
    for attr in &field.attrs {
        if attr.path().is_ident("value") {
            attr.meta.require_path_only()?;
            marked = true;
        }
    }
    Ok(marked)
}
