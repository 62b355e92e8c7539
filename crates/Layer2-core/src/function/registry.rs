//! Function Registry - 함수 등록 및 조회
//!
//! 모델이 호출할 수 있는 로컬 함수를 관리합니다.
//!
//! ## 사용법
//! ```ignore
//! let mut registry = FunctionRegistry::with_builtins();
//! registry.load_manifests(&config.functions_path)?;
//!
//! // 역할이 허용하는 함수만 모델에 제공
//! let offered = registry.definitions_for(&role.allowed_functions);
//! ```

use super::builtin;
use super::manifest::ManifestFunction;
use crate::role::FunctionScope;
use async_trait::async_trait;
use serde_json::Value;
use shellforge_foundation::Result;
use shellforge_provider::FunctionDef;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, warn};

/// A local capability the model may ask to run
#[async_trait]
pub trait Function: Send + Sync {
    /// Unique name, as sent to the model
    fn name(&self) -> &str;

    /// Definition offered to the model
    fn definition(&self) -> FunctionDef;

    /// Run with parsed arguments and return the text fed back to the model
    async fn execute(&self, arguments: Value) -> Result<String>;
}

/// 함수 레지스트리
#[derive(Default)]
pub struct FunctionRegistry {
    functions: BTreeMap<String, Arc<dyn Function>>,
}

impl FunctionRegistry {
    /// 빈 레지스트리 생성
    pub fn new() -> Self {
        Self::default()
    }

    /// Builtin 함수들을 포함한 레지스트리 생성
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        for function in builtin::all_functions() {
            registry.register(function);
        }
        registry
    }

    /// 함수 등록 (같은 이름은 교체)
    pub fn register(&mut self, function: Arc<dyn Function>) {
        let name = function.name().to_string();
        if self.functions.insert(name.clone(), function).is_some() {
            debug!("Function {} replaced", name);
        }
    }

    /// 디렉토리의 `*.json` 매니페스트를 모두 등록
    ///
    /// 잘못된 매니페스트는 경고 후 건너뜁니다. 등록한 개수를 반환.
    pub fn load_manifests(&mut self, dir: &Path) -> Result<usize> {
        let entries = match std::fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(e.into()),
        };

        let mut paths: Vec<_> = entries
            .flatten()
            .map(|e| e.path())
            .filter(|p| p.extension().and_then(|e| e.to_str()) == Some("json"))
            .collect();
        paths.sort();

        let mut count = 0;
        for path in paths {
            match ManifestFunction::load(&path) {
                Ok(function) => {
                    self.register(Arc::new(function));
                    count += 1;
                }
                Err(e) => warn!("Skipping function manifest {}: {}", path.display(), e),
            }
        }
        Ok(count)
    }

    /// 함수 조회
    pub fn get(&self, name: &str) -> Option<Arc<dyn Function>> {
        self.functions.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    /// 모든 함수 이름 (정렬)
    pub fn names(&self) -> Vec<&str> {
        self.functions.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }

    /// 역할이 허용하는 함수 정의 (이름순)
    pub fn definitions_for(&self, scope: &FunctionScope) -> Vec<FunctionDef> {
        self.functions
            .values()
            .filter(|f| scope.allows(f.name()))
            .map(|f| f.definition())
            .collect()
    }
}
