use crate::domain::ports::TestDetector;

/// Python test code detector
///
/// Conventions:
/// - test_*.py files
/// - *_test.py files
/// - tests/ directories
/// - test_* functions
/// - Test* classes
///
/// Symbols are in-module dotted paths: `run`, `Cart.total`, `TestCart.test_total`.
#[derive(Debug, Clone, Copy, Default)]
pub struct PythonTestDetector;

impl TestDetector for PythonTestDetector {
    fn is_test_code(&self, symbol: &str, file_path: &str) -> bool {
        let file_path = file_path.replace('\\', "/");

        // Check file path patterns
        if file_path.contains("/tests/")
            || file_path.contains("/test/")
            || file_path.starts_with("tests/")
            || file_path.starts_with("test/")
        {
            return true;
        }

        // Check file name patterns
        if file_path
            .split('/')
            .next_back()
            .is_some_and(|filename| filename.starts_with("test_") || filename.ends_with("_test.py"))
        {
            return true;
        }

        if symbol.is_empty() {
            return false;
        }

        let mut segments: Vec<&str> = symbol.split('.').collect();
        // Python test functions: test_*
        if segments.pop().is_some_and(|name| name.starts_with("test_")) {
            return true;
        }
        // Python test classes: Test*
        segments.iter().any(|class| class.starts_with("Test"))
    }

    fn language(&self) -> &str {
        "python"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detects_test_directory() {
        let detector = PythonTestDetector;
        assert!(detector.is_test_code("", "tests/test_api.py"));
        assert!(detector.is_test_code("", "myproject/tests/test_utils.py"));
        assert!(detector.is_test_code("", r"myproject\tests\helpers.py"));
        assert!(!detector.is_test_code("", "src/utils.py"));
    }

    #[test]
    fn test_detects_test_file_prefix_and_suffix() {
        let detector = PythonTestDetector;
        assert!(detector.is_test_code("", "test_api.py"));
        assert!(detector.is_test_code("", "src/utils_test.py"));
        assert!(!detector.is_test_code("", "src/api.py"));
        assert!(!detector.is_test_code("", "src/contest.py"));
    }

    #[test]
    fn test_detects_test_function() {
        let detector = PythonTestDetector;
        assert!(detector.is_test_code("test_my_function", "src/module.py"));
        assert!(!detector.is_test_code("my_function", "src/module.py"));
        assert!(!detector.is_test_code("latest_value", "src/module.py"));
    }

    #[test]
    fn test_detects_test_class() {
        let detector = PythonTestDetector;
        assert!(detector.is_test_code("TestMyClass.setup", "src/module.py"));
        assert!(detector.is_test_code("TestMyClass.test_method", "src/module.py"));
        assert!(!detector.is_test_code("MyClass.method", "src/module.py"));
        // A method named Test* is not a class
        assert!(!detector.is_test_code("MyClass.Testify", "src/module.py"));
    }
}
