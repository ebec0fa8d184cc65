use darling::{util::Flag, FromDeriveInput, FromField};
use proc_macro2::TokenStream;
use quote::quote;
use syn::spanned::Spanned;

#[derive(FromDeriveInput, Debug)]
#[darling(attributes(argument), forward_attrs(allow, doc, cfg, repr))]
struct EncodableStruct {
    ident: syn::Ident,
    generics: syn::Generics,
}

#[derive(FromField)]
#[darling(attributes(argument))]
struct EncodableField {
    ident: Option<syn::Ident>,
    #[darling(default)]
    buffer: Flag,
    #[darling(default)]
    texture: Flag,
    #[darling(default)]
    sampler: Flag,
    #[darling(default)]
    value: Flag,
    #[darling(default)]
    argument_buffer: Flag,
    #[darling(default)]
    argument_buffer_array: Flag,
    #[darling(default)]
    assume_consistent_usage: Flag,
    #[darling(default)]
    key: Option<String>,
    #[darling(default)]
    index: Option<usize>,
    #[darling(default)]
    offset: Option<u64>,
}

/// Generates `impl Encodable for Struct { fn encode_into(...) { ... } }`: one binding call
/// per annotated field, in declaration order, keyed by the field's name unless overridden
/// with `#[argument(key = "...")]`.
pub fn generate(ast: &syn::DeriveInput, fields: &syn::Fields) -> TokenStream {
    let s: EncodableStruct = match <EncodableStruct as FromDeriveInput>::from_derive_input(ast) {
        Ok(s) => s,
        Err(e) => return e.write_errors(),
    };

    let struct_name = &s.ident;
    let (impl_generics, ty_generics, where_clause) = s.generics.split_for_impl();

    let fields = match fields {
        syn::Fields::Named(ref named) => &named.named,
        syn::Fields::Unnamed(_) => {
            return syn::Error::new(
                ast.span(),
                "Encodable cannot be derived on tuple structs: fields need names to serve as default binding keys",
            )
            .to_compile_error();
        }
        syn::Fields::Unit => {
            return syn::Error::new(ast.span(), "Encodable cannot be derived on unit structs").to_compile_error();
        }
    };

    let mut stmts = Vec::new();

    for f in fields.iter() {
        let field: EncodableField = match <EncodableField as FromField>::from_field(f) {
            Ok(field) => field,
            Err(e) => {
                stmts.push(e.write_errors());
                continue;
            }
        };

        let name = field.ident.as_ref().unwrap();
        let span = name.span();

        let mut num_attrs = 0;
        if field.buffer.is_some() {
            num_attrs += 1;
        }
        if field.texture.is_some() {
            num_attrs += 1;
        }
        if field.sampler.is_some() {
            num_attrs += 1;
        }
        if field.value.is_some() {
            num_attrs += 1;
        }
        if field.argument_buffer.is_some() {
            num_attrs += 1;
        }
        if field.argument_buffer_array.is_some() {
            num_attrs += 1;
        }

        if num_attrs == 0 {
            stmts.push(
                syn::Error::new(
                    span,
                    "missing `argument(...)` attribute: annotate with one of \
                     buffer/texture/sampler/value/argument_buffer/argument_buffer_array",
                )
                .to_compile_error(),
            );
            continue;
        } else if num_attrs > 1 {
            stmts.push(
                syn::Error::new(span, "field has more than one `argument(...)` kind attribute").to_compile_error(),
            );
            continue;
        }

        let key = field.key.clone().unwrap_or_else(|| name.to_string());
        let index = field.index.unwrap_or(0);
        let offset = field.offset.unwrap_or(0);

        let stmt = if field.buffer.is_some() {
            quote! { encoder.set_buffer(#key, #index, self.#name, #offset); }
        } else if field.texture.is_some() {
            quote! { encoder.set_texture(#key, #index, self.#name); }
        } else if field.sampler.is_some() {
            quote! { encoder.set_sampler(#key, #index, self.#name); }
        } else if field.value.is_some() {
            quote! { encoder.set_value(#key, #index, self.#name); }
        } else if field.argument_buffer.is_some() {
            quote! { encoder.set_argument_buffer(#key, self.#name); }
        } else {
            debug_assert!(field.argument_buffer_array.is_some());
            let assume_consistent = field.assume_consistent_usage.is_some();
            quote! { encoder.set_argument_buffer_array(#key, self.#name.as_ref(), #assume_consistent); }
        };

        stmts.push(stmt);
    }

    quote! {
        impl #impl_generics framegraph::argument::Encodable for #struct_name #ty_generics #where_clause {
            fn encode_into(&self, encoder: &mut framegraph::encoder::ResourceBindingEncoder) {
                #(#stmts)*
            }
        }
    }
}
