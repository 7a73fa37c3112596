/// Build a [`Document`](crate::indexer::Document) from `field => text` pairs,
/// each text split on whitespace.
#[macro_export]
macro_rules! doc(
    () => {
        {
            ($crate::indexer::Document::default())
        }
    }; // avoids a warning due to the useless `mut`.
    ($($field:expr => $value:expr),*) => {
        {
            let mut document = $crate::indexer::Document::default();
            $(
                document.add_text($field, $value);
            )*
            document
        }
    };
    // if there is a trailing comma retry with the trailing comma stripped.
    ($($field:expr => $value:expr),+ ,) => {
        $crate::doc!( $( $field => $value ), *)
    };
);
