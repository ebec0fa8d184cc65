//! Proc-macro companion to `framegraph`: derives
//! [`Encodable`](https://docs.rs/framegraph/*/framegraph/argument/trait.Encodable.html) for a
//! user struct, turning annotated fields into a fixed sequence of binding calls against a
//! [`ResourceBindingEncoder`](https://docs.rs/framegraph/*/framegraph/encoder/struct.ResourceBindingEncoder.html).
//!
//! Modeled on `render/macros/src/arguments.rs`'s `#[derive(Arguments)]`: same darling-based
//! per-field attribute scheme, narrowed to the bindings §4.D/§4.E's argument buffers actually
//! carry (buffer, texture, sampler, inline value, nested argument buffer / argument buffer
//! array) instead of the render crate's pipeline-wide surface (render targets, viewports,
//! vertex/index buffers).

extern crate darling;
extern crate proc_macro;
extern crate proc_macro2;
extern crate quote;
extern crate syn;

mod encodable;

#[proc_macro_derive(Encodable, attributes(argument))]
pub fn encodable_derive(input: proc_macro::TokenStream) -> proc_macro::TokenStream {
    let ast: syn::DeriveInput = syn::parse(input).expect("couldn't parse item");

    let result = match ast.data {
        syn::Data::Struct(ref s) => encodable::generate(&ast, &s.fields),
        _ => panic!("Encodable can only be derived on structs"),
    };

    result.into()
}
