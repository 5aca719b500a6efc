/// Declares a [`Model`](crate::model::Model) marker type.
///
/// ```
/// memomodel::model! {
///     pub struct Article as "articles" { title, body, tags }
/// }
///
/// memomodel::model! {
///     pub struct Session as "sessions", id = "token" { user, expires_at }
/// }
///
/// use memomodel::model::Model;
/// assert_eq!(Article::FIELDS, &["title", "body", "tags"]);
/// assert_eq!(Session::ID_FIELD, "token");
/// ```
#[macro_export]
macro_rules! model {
    ($(#[$meta:meta])* $vis:vis struct $name:ident as $model_name:literal { $($field:ident),* $(,)? }) => {
        $crate::model! {
            $(#[$meta])* $vis struct $name as $model_name, id = "id" { $($field),* }
        }
    };
    ($(#[$meta:meta])* $vis:vis struct $name:ident as $model_name:literal, id = $id:literal { $($field:ident),* $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
        $vis struct $name;

        impl $crate::model::Model for $name {
            const NAME: &'static str = $model_name;
            const FIELDS: &'static [&'static str] = &[$(stringify!($field)),*];
            const ID_FIELD: &'static str = $id;
        }
    };
}
