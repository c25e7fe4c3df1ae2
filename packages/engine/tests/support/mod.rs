pub mod scripted;

#[macro_export]
macro_rules! reconcile_test {
    ($name:ident, |$mode:ident| $body:block) => {
        paste::paste! {
            #[test]
            fn [<$name _sync>]() {
                let $mode = $crate::support::scripted::ExecutionMode::Sync;
                $crate::support::scripted::block_on(async move $body);
            }

            #[test]
            fn [<$name _async>]() {
                let $mode = $crate::support::scripted::ExecutionMode::Async;
                $crate::support::scripted::block_on(async move $body);
            }
        }
    };
}
