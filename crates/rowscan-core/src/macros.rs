/// Implement [`Bind`](crate::Bind) for a record type.
///
/// List every field in declaration order with its type. A field may carry an
/// explicit column name (`= "name"`; the ignore marker `"-"` skips it), and
/// the modifiers `#[embedded]` (promote the fields of a nested record into
/// this record's namespace, prefixed by the column name if one is given)
/// and `#[ignored]`.
///
/// The record must also implement `Default` and `serde::Deserialize`.
///
/// ```
/// use rowscan_core::bind_struct;
/// use serde::Deserialize;
///
/// #[derive(Debug, Default, Deserialize)]
/// struct Address {
///     city: String,
/// }
///
/// bind_struct!(Address { city: String });
///
/// #[derive(Debug, Default, Deserialize)]
/// struct User {
///     id: i64,
///     name: String,
///     address: Option<Address>,
///     secret: String,
/// }
///
/// bind_struct!(User {
///     id: i64 = "user_id",
///     name: String,
///     #[embedded]
///     address: Option<Address> = "addr",
///     #[ignored]
///     secret: String,
/// });
/// ```
#[macro_export]
macro_rules! bind_struct {
    ($name:ident {
        $( $(#[$modifier:ident])* $field:ident : $fty:ty $(= $binding:literal)? ),* $(,)?
    }) => {
        impl $crate::Bind for $name {
            fn shape() -> $crate::Shape {
                $crate::Shape::composite::<Self>(::std::vec![
                    $(
                        $crate::FieldDescriptor::new(
                            ::std::stringify!($field),
                            <$fty as $crate::Bind>::shape,
                        )
                        $(.$modifier())*
                        $(.with_binding($binding))?
                    ),*
                ])
            }

            fn fields_mut(&mut self) -> ::std::vec::Vec<&mut dyn $crate::Slot> {
                ::std::vec![$( &mut self.$field as &mut dyn $crate::Slot ),*]
            }
        }
    };
}
