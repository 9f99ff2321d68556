//! Shared on-disk fixtures for integration tests.
#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use cov_relay_core::discovery::{Build, Project};

pub fn write(path: &Path, content: &str) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

/// A JaCoCo report covering line 3 and missing line 4 of `package/sourcefile`.
pub fn jacoco_xml(package: &str, sourcefile: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<!DOCTYPE report PUBLIC "-//JACOCO//DTD Report 1.1//EN" "report.dtd">
<report name="module">
  <sessioninfo id="host-1" start="1" dump="2"/>
  <package name="{package}">
    <class name="{package}/Main" sourcefilename="{sourcefile}">
      <method name="run" desc="()V" line="3">
        <counter type="LINE" missed="1" covered="1"/>
      </method>
    </class>
    <sourcefile name="{sourcefile}">
      <line nr="3" mi="0" ci="2" mb="0" cb="0"/>
      <line nr="4" mi="3" ci="0" mb="0" cb="0"/>
      <counter type="LINE" missed="1" covered="1"/>
    </sourcefile>
  </package>
</report>
"#
    )
}

/// Creates `<base>/<name>` as a JVM module with one source file and a JaCoCo report for it.
///
/// `sourcefile` picks the language, e.g. `Alpha.java` or `Alpha.kt`.
pub fn jvm_module(base: &Path, name: &str, sourcefile: &str) -> Project {
    let module = base.join(name);
    let src = module.join("src/main/java");
    write(&src.join("org/demo").join(sourcefile), "// source\n");
    write(
        &module.join("target/site/jacoco/jacoco.xml"),
        &jacoco_xml("org/demo", sourcefile),
    );
    Project::new(vec![src], build_of(&module))
}

pub fn build_of(module: &Path) -> Build {
    Build {
        directory: module.join("target"),
        test_output_directory: module.join("target/test-classes"),
    }
}

pub fn report_path(base: &Path, module: &str) -> PathBuf {
    base.join(module).join("target/site/jacoco/jacoco.xml")
}
