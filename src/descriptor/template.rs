//! Placeholder templates for generated build descriptors
//!
//! Templates use `{{name}}` placeholders. Rendering fails when a required
//! placeholder is absent from the template or when the template uses a
//! placeholder that has no value.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use regex::Regex;

/// Default `meson.build` for the library tree
pub const DEFAULT_LIBRARY_TEMPLATE: &str = r#"project('{{name}}', 'c',
  version: '{{version}}',
  license: 'MIT',
  meson_version: '>=1.3',
  default_options: [
    'c_std=c11',
    'warning_level=2',
    'werror=false',
  ],
)

add_project_arguments(
  [
    '-DWLR_USE_UNSTABLE',
    '-D_POSIX_C_SOURCE=200809L',
  ],
  language: 'c',
)

cc = meson.get_compiler('c')

wlroots = dependency('wlroots-0.20', version: ['>=0.20.0', '<0.21.0'])
wayland_server = dependency('wayland-server', version: '>=1.21.0')
pixman = dependency('pixman-1')
math = cc.find_library('m')

{{ident}}_deps = [
  wlroots,
  wayland_server,
  pixman,
  math,
]

{{ident}}_sources = files(
{{sources}}
)

{{ident}}_inc = include_directories('include')

{{ident}}_lib = library(
  '{{name}}',
  {{ident}}_sources,
  include_directories: {{ident}}_inc,
  dependencies: {{ident}}_deps,
  install: true,
)

pkg = import('pkgconfig')
pkg.generate(
  {{ident}}_lib,
  description: '{{description}}',
  subdirs: ['{{include_subdir}}'],
)

{{ident}}_dep = declare_dependency(
  link_with: {{ident}}_lib,
  include_directories: {{ident}}_inc,
  dependencies: {{ident}}_deps,
)

install_headers(
{{headers}}
  subdir: '{{include_subdir}}',
)
"#;

/// Default dependency declaration injected into the standalone tree
pub const DEFAULT_STANDALONE_TEMPLATE: &str =
    "{{variable}} = dependency('{{name}}', version: '{{version_requirement}}', required: true)";

/// README written next to the library descriptor
pub const LIBRARY_README_TEMPLATE: &str = r#"# {{name}}

{{description}}.

## Building

```bash
meson setup build
ninja -C build
sudo ninja -C build install
```

## Usage

Include in your meson.build:
```meson
{{ident}}_dep = dependency('{{name}}')
```

Use in your code:
```c
#include <{{include_subdir}}/scene.h>
```

## Origin

Generated for version {{version}}.
"#;

fn placeholder_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\{\{\s*([A-Za-z_][A-Za-z0-9_]*)\s*\}\}").expect("static regex"))
}

/// Names of every placeholder used in `template`, in order of first use
pub fn placeholders(template: &str) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for caps in placeholder_regex().captures_iter(template) {
        let name = caps[1].to_string();
        if !names.contains(&name) {
            names.push(name);
        }
    }
    names
}

/// Render `template` with `vars`.
///
/// Returns an error message when a `required` placeholder is absent or when
/// the template uses a placeholder missing from `vars`.
pub fn render(
    template: &str,
    vars: &BTreeMap<&str, String>,
    required: &[&str],
) -> std::result::Result<String, String> {
    let used = placeholders(template);

    let absent: Vec<&str> = required
        .iter()
        .copied()
        .filter(|r| !used.iter().any(|u| u == r))
        .collect();
    if !absent.is_empty() {
        return Err(format!(
            "template is missing required placeholder(s): {}",
            absent
                .iter()
                .map(|a| format!("{{{{{}}}}}", a))
                .collect::<Vec<_>>()
                .join(", ")
        ));
    }

    if let Some(unknown) = used.iter().find(|u| !vars.contains_key(u.as_str())) {
        return Err(format!("template uses unknown placeholder {{{{{}}}}}", unknown));
    }

    let rendered = placeholder_regex().replace_all(template, |caps: &regex::Captures| {
        vars.get(&caps[1]).cloned().unwrap_or_default()
    });
    Ok(rendered.into_owned())
}
