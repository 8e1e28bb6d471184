//! Document clustering (the `LJCluster` library).
//!
//! Documents are fed one at a time with a caller-chosen signature; the
//! library maintains the clustering incrementally and reports the current
//! grouping as a small fixed-shape XML document.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use libc::c_char;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::components;
use crate::error::{NlpirError, Result};
use crate::native::{Component, ComponentCell, ComponentConfig, NativeLibrary};

const LAST_ERROR: &str = "CLUS_GetLastErrMsg";

/// One cluster: its feature words and the signatures of its documents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterGroup {
    pub id: u32,
    pub features: Vec<String>,
    pub docs: Vec<String>,
}

/// The clustering component.
pub struct Cluster {
    lib: NativeLibrary,
    data_dir: PathBuf,
}

static CELL: ComponentCell<Cluster> = ComponentCell::new();

impl Component for Cluster {
    const NAME: &'static str = "cluster";

    fn boot(config: &ComponentConfig) -> Result<Self> {
        let lib = NativeLibrary::open("LJCluster", config.encoding, &config.resolved_lib_dir())?;
        let data_dir = config.resolved_data_dir();
        // Argument order differs from the family norm: license before
        // encoding.
        type InitFn =
            unsafe extern "C" fn(*const c_char, *const c_char, libc::c_int) -> bool;
        let init: InitFn = lib.func("CLUS_Init")?;
        let data = lib.path_to_native(&data_dir)?;
        let license = lib.to_native(&config.license_code)?;
        let ok = unsafe {
            init(
                data.as_ptr(),
                license.as_ptr(),
                lib.encoding().native_code(),
            )
        };
        if !ok {
            return Err(NlpirError::InitFailed {
                component: Self::NAME,
                detail: components::last_error(&lib, Some(LAST_ERROR)),
            });
        }
        Ok(Self { lib, data_dir })
    }
}

impl Drop for Cluster {
    fn drop(&mut self) {
        components::run_exit_void(&self.lib, Self::NAME, "CLUS_Exit");
    }
}

impl Cluster {
    /// The process-wide instance, constructed on first call.
    pub fn handle() -> Result<Arc<Self>> {
        CELL.get()
    }

    /// Adjust settings before the first [`Cluster::handle`] call.
    pub fn configure(apply: impl FnOnce(&mut ComponentConfig)) -> Result<()> {
        CELL.configure(apply)
    }

    /// Release the instance for the remainder of the process.
    pub fn shutdown() -> bool {
        CELL.shutdown()
    }

    /// The data root this instance was initialized with.
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Cap the cluster count and document count of the run.
    pub fn set_parameter(&self, max_clusters: u32, max_docs: u32) -> Result<bool> {
        type SetParamFn = unsafe extern "C" fn(libc::c_int, libc::c_int) -> bool;
        let f: SetParamFn = self.lib.func("CLUS_SetParameter")?;
        Ok(unsafe { f(max_clusters as libc::c_int, max_docs as libc::c_int) })
    }

    /// Feed a document with its signature (any caller-chosen identifier).
    pub fn add_text(&self, text: &str, signature: &str) -> Result<bool> {
        type AddContentFn = unsafe extern "C" fn(*const c_char, *const c_char) -> bool;
        let f: AddContentFn = self.lib.func("CLUS_AddContent")?;
        let text = self.lib.to_native(text)?;
        let signature = self.lib.to_native(signature)?;
        Ok(unsafe { f(text.as_ptr(), signature.as_ptr()) })
    }

    /// Feed a document from a file.
    pub fn add_file(&self, path: &Path, signature: &str) -> Result<bool> {
        type AddFileFn = unsafe extern "C" fn(*const c_char, *const c_char) -> bool;
        let f: AddFileFn = self.lib.func("CLUS_AddFile")?;
        let path = self.lib.path_to_native(path)?;
        let signature = self.lib.to_native(signature)?;
        Ok(unsafe { f(path.as_ptr(), signature.as_ptr()) })
    }

    /// Write the current clustering as XML into `xml_path`.
    pub fn latest_result_to_file(&self, xml_path: &Path, out_dir: Option<&Path>) -> Result<()> {
        type ResultFn = unsafe extern "C" fn(*const c_char, *const c_char) -> bool;
        let f: ResultFn = self.lib.func("CLUS_GetLatestResult")?;
        let xml_path = self.lib.path_to_native(xml_path)?;
        let out_dir = match out_dir {
            Some(dir) => Some(self.lib.path_to_native(dir)?),
            None => None,
        };
        let out_ptr = out_dir
            .as_ref()
            .map(|dir| dir.as_ptr())
            .unwrap_or(std::ptr::null());
        if !unsafe { f(xml_path.as_ptr(), out_ptr) } {
            return Err(NlpirError::NativeFailure {
                operation: "CLUS_GetLatestResult",
                detail: components::last_error(&self.lib, Some(LAST_ERROR)),
            });
        }
        Ok(())
    }

    /// The current clustering, parsed from the in-memory XML result.
    pub fn latest_result(&self, out_dir: Option<&Path>) -> Result<Vec<ClusterGroup>> {
        type ResultFn = unsafe extern "C" fn(*const c_char) -> *const c_char;
        let f: ResultFn = self.lib.func("CLUS_GetLatestResultE")?;
        let out_dir = match out_dir {
            Some(dir) => Some(self.lib.path_to_native(dir)?),
            None => None,
        };
        let out_ptr = out_dir
            .as_ref()
            .map(|dir| dir.as_ptr())
            .unwrap_or(std::ptr::null());
        let result = unsafe { f(out_ptr) };
        Ok(parse_cluster_xml(&self.lib.from_native(result)))
    }

    /// Discard all fed documents.
    pub fn clean_data(&self) -> Result<()> {
        type CleanFn = unsafe extern "C" fn();
        let f: CleanFn = self.lib.func("CLUS_CleanData")?;
        unsafe { f() };
        Ok(())
    }
}

// The result XML has exactly two interesting element shapes; extracting them
// directly keeps the crate free of a general XML dependency.
static CLUS_BLOCK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?s)<clus id="(\d+)">(.*?)</clus>"#).expect("valid regex"));
static FEATURE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)<feature>(.*?)</feature>").expect("valid regex"));
static DOC: Lazy<Regex> = Lazy::new(|| Regex::new(r"<doc>(.*?)</doc>").expect("valid regex"));

fn parse_cluster_xml(raw: &str) -> Vec<ClusterGroup> {
    CLUS_BLOCK
        .captures_iter(raw)
        .filter_map(|caps| {
            let id = caps[1].parse().ok()?;
            let body = &caps[2];
            let features = FEATURE
                .captures_iter(body)
                .flat_map(|f| {
                    f[1].split_whitespace()
                        .map(str::to_string)
                        .collect::<Vec<_>>()
                })
                .collect();
            let docs = DOC
                .captures_iter(body)
                .map(|d| d[1].trim().to_string())
                .collect();
            Some(ClusterGroup { id, features, docs })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"<?xml version="1.0" encoding="gb2312" standalone="yes" ?>
<LJCluster-Result>
<clusnum>2</clusnum>

<clus id="0">
    <feature>奥巴马 竞选 财务部</feature>
    <docs num="6">
       <doc>2</doc>
       <doc>3</doc>
       <doc>35</doc>
       <doc>86</doc>
       <doc>345</doc>
       <doc>975</doc>
    </docs>
</clus>

<clus id="1">
    <feature>林志玲 影视 电影 广告</feature>
    <docs num="4">
       <doc>45</doc>
       <doc>86</doc>
       <doc>135</doc>
       <doc>286</doc>
    </docs>
</clus>
</LJCluster-Result>"#;

    #[test]
    fn result_xml_parses() {
        let groups = parse_cluster_xml(SAMPLE);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].id, 0);
        assert_eq!(groups[0].features, vec!["奥巴马", "竞选", "财务部"]);
        assert_eq!(groups[0].docs.len(), 6);
        assert_eq!(groups[1].features.len(), 4);
        assert_eq!(groups[1].docs, vec!["45", "86", "135", "286"]);
    }

    #[test]
    fn empty_result_parses_to_no_groups() {
        assert!(parse_cluster_xml("<LJCluster-Result></LJCluster-Result>").is_empty());
    }
}
