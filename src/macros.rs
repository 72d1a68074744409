// src/macros.rs
#[macro_export]
macro_rules! s {
    // String shorthand!

    // Zero-arg → String::new()
    () => {
        ::std::string::String::new()
    };
    // Anything `String::from` takes
    ($expr:expr) => {
        ::std::string::String::from($expr)
    };
}

#[macro_export]
macro_rules! tags {
    // Tag map shorthand: tags! { "color" => "red", "flower" => "rose" }
    () => {
        ::std::collections::BTreeMap::<::std::string::String, ::std::string::String>::new()
    };
    ($($k:expr => $v:expr),+ $(,)?) => {{
        let mut m = ::std::collections::BTreeMap::<::std::string::String, ::std::string::String>::new();
        $(
            m.insert(::std::string::String::from($k), ::std::string::String::from($v));
        )+
        m
    }};
}
