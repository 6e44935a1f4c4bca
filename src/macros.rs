macro_rules! impl_to_perf_string_on_display {
    ($($t:ty), *) => {
        $(
            impl ToPerfString for $t {
                fn to_perf_string(&self) -> String {
                    format!("{}", self)
                }
            }
        )*
    };
}

/// Joins a performance data label and its fields as `label=a;b;c`, dropping empty trailing
/// fields.
macro_rules! perf_string {
    ($label:expr, $( $field:expr ), *) => {
        {
            let fields: Vec<String> = vec![$( $field.to_perf_string() ), *];
            format!("{}={}", $label, fields.join(";").trim_end_matches(';'))
        }
    };
}

#[cfg(test)]
mod tests {
    use crate::ToPerfString;

    #[test]
    fn test_perf_string_macro() {
        let none: Option<f64> = None;
        assert_eq!(perf_string!("load", 3.5f64, none, none), "load=3.5");
        assert_eq!(perf_string!("load", 3.5f64, none, Some(4.0f64)), "load=3.5;;4");
        assert_eq!(perf_string!("n", 7i64), "n=7");
    }
}
