use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::spanned::Spanned;
use syn::{parse_macro_input, FnArg, Ident, ItemFn, LitStr};

/// Turn a render function into a stable `ComponentRef` constructor.
///
/// ```ignore
/// #[component]
/// fn Greeting(props: &Props, cx: &mut RenderContext<'_>) -> Element {
///     h("p", Props::new(), props.get_str("name").unwrap_or("stranger").to_owned())
/// }
///
/// let element = h(Greeting(), Props::new().with("name", "Ada"), ());
/// ```
///
/// Every call to the generated function on one thread returns the same
/// component identity, so fibers built from it match across renders. With
/// `#[component(fallible)]` the body returns `Result<_, ComponentError>`.
#[proc_macro_attribute]
pub fn component(attr: TokenStream, item: TokenStream) -> TokenStream {
    let attr_tokens = TokenStream2::from(attr);
    let mut fallible = false;
    if !attr_tokens.is_empty() {
        match syn::parse2::<Ident>(attr_tokens) {
            Ok(ident) if ident == "fallible" => fallible = true,
            Ok(other) => {
                return syn::Error::new_spanned(other, "unsupported component attribute")
                    .to_compile_error()
                    .into();
            }
            Err(err) => {
                return err.to_compile_error().into();
            }
        }
    }

    let func = parse_macro_input!(item as ItemFn);
    match expand(func, fallible) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

fn expand(func: ItemFn, fallible: bool) -> syn::Result<TokenStream2> {
    let sig = &func.sig;
    if !sig.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            &sig.generics,
            "components cannot be generic",
        ));
    }
    if sig.asyncness.is_some() {
        return Err(syn::Error::new(sig.span(), "components cannot be async"));
    }
    if sig.inputs.len() != 2 {
        return Err(syn::Error::new_spanned(
            &sig.inputs,
            "components take `(props: &Props, cx: &mut RenderContext<'_>)`",
        ));
    }
    if let Some(FnArg::Receiver(receiver)) = sig.inputs.first() {
        return Err(syn::Error::new_spanned(
            receiver,
            "components cannot take `self`",
        ));
    }

    let attrs = &func.attrs;
    let vis = &func.vis;
    let name = &sig.ident;
    let name_str = LitStr::new(&name.to_string(), name.span());
    let inputs = &sig.inputs;
    let output = &sig.output;
    let block = &func.block;
    let constructor = if fallible {
        quote! { ::fiber_core::ComponentRef::fallible }
    } else {
        quote! { ::fiber_core::ComponentRef::new }
    };

    Ok(quote! {
        #(#attrs)*
        #[allow(non_snake_case)]
        #vis fn #name() -> ::fiber_core::ComponentRef {
            fn __render(#inputs) #output #block

            ::std::thread_local! {
                static COMPONENT: ::fiber_core::ComponentRef = #constructor(#name_str, __render);
            }
            COMPONENT.with(::std::clone::Clone::clone)
        }
    })
}
