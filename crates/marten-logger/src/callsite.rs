//! Caller identity captured at the logging call site

/// Identity of the code location that issued a log call.
///
/// Captured by [`callsite!`](crate::callsite!) in the caller's own frame, so
/// the record names the function that logged, not the logger internals. The
/// formatter never computes this itself.
#[derive(Debug, Clone, Copy)]
pub struct CallSite {
    /// Fully-qualified name of the enclosing function.
    pub function: &'static str,
    /// Source path as seen by the compiler.
    pub file: &'static str,
    /// 1-based line number of the call.
    pub line: u32,
}

/// Capture the enclosing function name, source file, and line number.
///
/// Expands in the caller's frame; the leveled macros insert one of these
/// into every accepted record.
#[macro_export]
macro_rules! callsite {
    () => {{
        fn f() {}
        fn type_name_of<T>(_: T) -> &'static str {
            ::std::any::type_name::<T>()
        }
        let name = type_name_of(f);
        $crate::CallSite {
            function: name.strip_suffix("::f").unwrap_or(name),
            file: file!(),
            line: line!(),
        }
    }};
}

#[cfg(test)]
mod tests {
    #[test]
    fn test_callsite_captures_enclosing_function() {
        let site = callsite!();
        assert!(
            site.function.ends_with("test_callsite_captures_enclosing_function"),
            "unexpected function name: {}",
            site.function
        );
        assert!(site.file.ends_with("callsite.rs"));
        assert!(site.line > 0);
    }
}
