#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Helper to create a temporary directory of requirements files
pub struct TempProject {
    pub dir: TempDir,
}

impl TempProject {
    pub fn new() -> Self {
        let dir = TempDir::new().expect("Failed to create temp directory");
        Self { dir }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Create a file in the project with the given content
    pub fn create_file(&self, relative_path: &str, content: &str) -> PathBuf {
        let file_path = self.dir.path().join(relative_path);

        if let Some(parent) = file_path.parent() {
            fs::create_dir_all(parent).expect("Failed to create parent directories");
        }

        fs::write(&file_path, content).expect("Failed to write file");
        file_path
    }

    pub fn read_file(&self, relative_path: &str) -> String {
        fs::read_to_string(self.dir.path().join(relative_path)).expect("Failed to read file")
    }
}

impl Default for TempProject {
    fn default() -> Self {
        Self::new()
    }
}

/// A requirements file exercising most of the grammar
pub fn sample_requirements_txt() -> &'static str {
    r#"# Sample requirements.txt
--index-url https://pypi.org/simple
--extra-index-url https://download.example.com/simple  # mirror

requests[security,socks] >= 2.28.0, < 3.0.0  # http
numpy==1.24.0
Django (>=4.0,<5.0) ; python_version >= "3.8"
zope.interface~=6.0
-e git+https://github.com/org/project.git@v1.0#egg=project
pkg @ https://example.com/pkg-1.0.tar.gz
hashed==1.0 \
    --hash=sha256:0123456789abcdef0123456789abcdef0123456789abcdef0123456789abcdef
-r requirements-dev.txt
-c constraints.txt
"#
}

pub fn sample_requirements_dev_txt() -> &'static str {
    r#"# Development dependencies
pytest>=7.0.0
pytest-cov==4.1.0
black==23.7.0
numpy==1.26.0
"#
}

pub fn sample_constraints_txt() -> &'static str {
    "urllib3<2\nnumpy<2\n"
}

/// A project with a root file, a dev include and a constraints file
pub fn create_temp_project_with_includes() -> TempProject {
    let project = TempProject::new();
    project.create_file("requirements.txt", sample_requirements_txt());
    project.create_file("requirements-dev.txt", sample_requirements_dev_txt());
    project.create_file("constraints.txt", sample_constraints_txt());
    project
}
