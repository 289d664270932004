//! Shared test utilities for integration and E2E tests.
//!
//! [`ScrollFixture`] lays out a small Scroll-like source tree (a scene
//! subsystem under `sway/tree/scene` plus the code that uses it) and a split
//! manifest for it, in a temporary directory.
//!
//! ```rust,ignore
//! mod common;
//! use common::prelude::*;
//!
//! #[test]
//! fn test_example() {
//!     let fixture = ScrollFixture::new();
//!     // ... test code
//! }
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use assert_fs::prelude::*;
use assert_fs::TempDir;

/// Re-export commonly used test dependencies for convenience.
pub mod prelude {
    pub use assert_cmd::cargo::cargo_bin_cmd;
    pub use assert_fs::prelude::*;
    #[allow(unused_imports)]
    pub use assert_fs::TempDir;
    pub use predicates::prelude::*;

    #[allow(unused_imports)]
    pub use super::fixtures;
    pub use super::ScrollFixture;
}

/// File contents of the sample tree
#[allow(dead_code)]
pub mod fixtures {
    pub const ROOT_MESON: &str = "project(
  'scroll',
  'c',
  version: '1.11.2',
  license: 'MIT',
)

cc = meson.get_compiler('c')
math = cc.find_library('m')
wlroots = dependency('wlroots-0.19')

subdir('sway')
";

    pub const SWAY_MESON: &str = "sway_sources = files(
  'main.c',
  'tree/view.c',
  'tree/scene/scene.c',
  'tree/scene/color.c',
)

subdir('tree/scene')

executable(
  'scroll',
  sway_sources,
  dependencies: [wlroots, math],
  install: true,
)
";

    /// Present in the source tree, gone from the standalone tree
    pub const SCENE_MESON: &str = "# scene sources are listed by the parent\n";

    pub const MAIN_C: &str = "#include \"sway/tree/scene.h\"
#include \"sway/tree/view.h\"

int main(void) {
\treturn 0;
}
";

    pub const VIEW_C: &str = "#include \"sway/tree/view.h\"
#include \"sway/tree/scene.h\"
#include \"sway/tree/scene/color.h\"

void view_init(void) {}
";

    pub const SCENE_C: &str = "#include \"sway/tree/scene.h\"
#include \"sway/tree/scene/color.h\"

void scene_init(void) {}
";

    pub const COLOR_C: &str = "#include \"sway/tree/scene/color.h\"

void color_init(void) {}
";

    pub const SCENE_H: &str = "#pragma once
#include \"sway/tree/scene/color.h\"

void scene_init(void);
";

    pub const COLOR_H: &str = "#pragma once

void color_init(void);
";

    pub const VIEW_H: &str = "#pragma once

void view_init(void);
";

    pub const MANIFEST: &str = r#"version: "1.0.0"
library:
  name: scene-scroll
scene_files:
  root: sway/tree/scene
  implementation:
    - sway/tree/scene/scene.c
    - sway/tree/scene/color.c
  headers:
    - include/sway/tree/scene.h
    - include/sway/tree/scene/color.h
  relocate:
    - from: '^sway/tree/scene/(.*)$'
      to: 'src/$1'
    - from: '^include/sway/tree/scene\.h$'
      to: 'include/scene-scroll/scene.h'
    - from: '^include/sway/tree/scene/(.*)$'
      to: 'include/scene-scroll/$1'
modifications:
  include_patterns:
    - from: '#include "sway/tree/scene.h"'
      to: '#include <scene-scroll/scene.h>'
      literal: true
    - from: '#include "sway/tree/scene/(\w+)\.h"'
      to: '#include <scene-scroll/$1.h>'
  file_patterns:
    - '*.c'
    - '*.h'
    - '**/*.c'
    - '**/*.h'
  redirect_headers:
    - path: include/sway/tree/scene.h
      include: <scene-scroll/scene.h>
"#;
}

/// A Scroll-like source tree with its manifest
pub struct ScrollFixture {
    pub temp: TempDir,
}

#[allow(dead_code)]
impl ScrollFixture {
    /// Source tree under `scroll/`, manifest at `split_manifest.yaml`
    pub fn new() -> Self {
        let temp = TempDir::new().expect("Failed to create temp directory");
        let fixture = Self { temp };

        fixture.source_file("meson.build", fixtures::ROOT_MESON);
        fixture.source_file("sway/meson.build", fixtures::SWAY_MESON);
        fixture.source_file("sway/main.c", fixtures::MAIN_C);
        fixture.source_file("sway/tree/view.c", fixtures::VIEW_C);
        fixture.source_file("sway/tree/scene/meson.build", fixtures::SCENE_MESON);
        fixture.source_file("sway/tree/scene/scene.c", fixtures::SCENE_C);
        fixture.source_file("sway/tree/scene/color.c", fixtures::COLOR_C);
        fixture.source_file("include/sway/tree/scene.h", fixtures::SCENE_H);
        fixture.source_file("include/sway/tree/scene/color.h", fixtures::COLOR_H);
        fixture.source_file("include/sway/tree/view.h", fixtures::VIEW_H);
        fixture.with_manifest(fixtures::MANIFEST)
    }

    /// Replace the manifest
    pub fn with_manifest(self, content: &str) -> Self {
        self.temp
            .child("split_manifest.yaml")
            .write_str(content)
            .expect("Failed to write manifest");
        self
    }

    /// Write a file into the source tree
    pub fn source_file(&self, rel: &str, content: &str) {
        self.temp
            .child("scroll")
            .child(rel)
            .write_str(content)
            .expect("Failed to write source file");
    }

    /// Remove a file from the source tree
    pub fn remove_source_file(&self, rel: &str) {
        fs::remove_file(self.source().join(rel)).expect("Failed to remove source file");
    }

    pub fn path(&self) -> &Path {
        self.temp.path()
    }

    pub fn source(&self) -> PathBuf {
        self.temp.path().join("scroll")
    }

    pub fn manifest(&self) -> PathBuf {
        self.temp.path().join("split_manifest.yaml")
    }

    pub fn workspace(&self) -> PathBuf {
        self.temp.path().join("workspace")
    }

    pub fn library(&self) -> PathBuf {
        self.workspace().join("scene-scroll")
    }

    pub fn standalone(&self) -> PathBuf {
        self.workspace().join("scroll-standalone")
    }

    /// Read a file from anywhere under the fixture root
    pub fn read(&self, rel: impl AsRef<Path>) -> String {
        fs::read_to_string(self.temp.path().join(rel)).expect("Failed to read file")
    }
}

impl Default for ScrollFixture {
    fn default() -> Self {
        Self::new()
    }
}
