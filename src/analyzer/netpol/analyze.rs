//! Analysis orchestration.
//!
//! Ties together manifest discovery, parsing, accumulation, resolution,
//! connection discovery and policy synthesis. Errors are collected as the
//! run goes; a fatal error (or a severe one in fail-fast mode) ends the run.

use crate::analyzer::netpol::accumulator::ResourceAccumulator;
use crate::analyzer::netpol::config::AnalyzerOptions;
use crate::analyzer::netpol::connections::discover_connections;
use crate::analyzer::netpol::context::Object;
use crate::analyzer::netpol::errors::FileProcessingError;
use crate::analyzer::netpol::parser::{locate_manifests, parse_manifest_file};
use crate::analyzer::netpol::policy::NetworkPolicy;
use crate::analyzer::netpol::supplemental::read_connections_file;
use crate::analyzer::netpol::synthesis::synthesize_policies;
use crate::analyzer::netpol::types::{Connection, Workload};
use std::path::Path;

/// Workloads and the connections between them.
#[derive(Debug, Clone, Default)]
pub struct Discovery {
    pub workloads: Vec<Workload>,
    pub connections: Vec<Connection>,
}

/// Discovers connectivity in Kubernetes manifests and synthesizes
/// NetworkPolicies for it.
///
/// Each top-level call starts a fresh run; [`Analyzer::errors`] holds every
/// error the latest run recorded, whether or not it succeeded.
#[derive(Debug, Default)]
pub struct Analyzer {
    options: AnalyzerOptions,
    errors: Vec<FileProcessingError>,
}

impl Analyzer {
    pub fn new(options: AnalyzerOptions) -> Self {
        Self {
            options,
            errors: Vec::new(),
        }
    }

    /// Errors recorded by the latest run, in the order they were found.
    pub fn errors(&self) -> &[FileProcessingError] {
        &self.errors
    }

    /// Synthesize policies for every manifest under `paths`.
    pub fn policies_from_folder_paths<P: AsRef<Path>>(
        &mut self,
        paths: &[P],
    ) -> Result<Vec<NetworkPolicy>, FileProcessingError> {
        self.errors.clear();
        let objects = self.read_objects(paths)?;
        let discovery = self.discover(&objects)?;
        Ok(self.synthesize(&discovery))
    }

    /// Discover connections for every manifest under `paths`.
    pub fn connections_from_folder_paths<P: AsRef<Path>>(
        &mut self,
        paths: &[P],
    ) -> Result<Vec<Connection>, FileProcessingError> {
        self.errors.clear();
        let objects = self.read_objects(paths)?;
        Ok(self.discover(&objects)?.connections)
    }

    /// Synthesize policies for already parsed objects.
    pub fn policies_from_objects(
        &mut self,
        objects: &[Object],
    ) -> Result<Vec<NetworkPolicy>, FileProcessingError> {
        self.errors.clear();
        let discovery = self.discover(objects)?;
        Ok(self.synthesize(&discovery))
    }

    /// Discover connections for already parsed objects.
    pub fn connections_from_objects(
        &mut self,
        objects: &[Object],
    ) -> Result<Vec<Connection>, FileProcessingError> {
        self.errors.clear();
        Ok(self.discover(objects)?.connections)
    }

    /// Record an error; return it when it must end the run.
    fn record(&mut self, err: FileProcessingError) -> Result<(), FileProcessingError> {
        let logger = &self.options.logger;
        if err.is_fatal() {
            logger.error(&err.to_string());
        } else if err.is_severe() {
            logger.warn(&err.to_string());
        } else {
            logger.info(&err.to_string());
        }

        let stop = err.is_fatal() || (err.is_severe() && self.options.fail_fast);
        self.errors.push(err.clone());
        if stop { Err(err) } else { Ok(()) }
    }

    fn record_all(
        &mut self,
        errors: impl IntoIterator<Item = FileProcessingError>,
    ) -> Result<(), FileProcessingError> {
        for err in errors {
            self.record(err)?;
        }
        Ok(())
    }

    fn read_objects<P: AsRef<Path>>(&mut self, paths: &[P]) -> Result<Vec<Object>, FileProcessingError> {
        let mut objects = Vec::new();

        for root in paths {
            let root = root.as_ref();
            self.options.logger.info(&format!("scanning {}", root.display()));
            let located = locate_manifests(root, self.options.walker.as_ref());
            self.record_all(located.errors)?;

            for file in &located.files {
                let parsed = parse_manifest_file(file);
                self.options.logger.debug(&format!(
                    "{}: {} object(s)",
                    file.display(),
                    parsed.objects.len()
                ));
                self.record_all(parsed.errors)?;
                objects.extend(parsed.objects);
            }
        }

        Ok(objects)
    }

    fn discover(&mut self, objects: &[Object]) -> Result<Discovery, FileProcessingError> {
        let mut accumulator = ResourceAccumulator::new();
        for object in objects {
            if let Err(err) = accumulator.add_object(object, self.options.logger.as_ref()) {
                self.record(err)?;
            }
        }

        if accumulator.is_empty() {
            self.record(FileProcessingError::no_relevant_resources_found())?;
        }

        let errors = accumulator.resolve();
        self.record_all(errors)?;

        let (workloads, services) = accumulator.into_parts();
        let mut connections = discover_connections(&workloads, &services);

        if let Some(path) = self.options.connections_file.clone() {
            let declared = read_connections_file(&path, &workloads);
            self.record_all(declared.errors)?;
            self.options.logger.info(&format!(
                "{} declared connection(s) read from {}",
                declared.connections.len(),
                path.display()
            ));
            connections.extend(declared.connections);
        }

        self.options.logger.info(&format!(
            "found {} workload(s), {} service(s), {} connection(s)",
            workloads.len(),
            services.len(),
            connections.len()
        ));

        Ok(Discovery {
            workloads,
            connections,
        })
    }

    fn synthesize(&self, discovery: &Discovery) -> Vec<NetworkPolicy> {
        let policies = synthesize_policies(
            &discovery.workloads,
            &discovery.connections,
            &self.options.dns_port,
        );
        self.options
            .logger
            .info(&format!("synthesized {} network policies", policies.len()));
        policies
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::netpol::config::Logger;
    use crate::analyzer::netpol::errors::ErrorKind;
    use crate::analyzer::netpol::parser::{WalkError, parse_yaml};
    use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
    use std::path::PathBuf;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct RecordingLogger {
        lines: Arc<Mutex<Vec<String>>>,
    }

    impl Logger for RecordingLogger {
        fn debug(&self, _msg: &str) {}
        fn info(&self, msg: &str) {
            self.lines.lock().unwrap().push(format!("info: {}", msg));
        }
        fn warn(&self, msg: &str) {
            self.lines.lock().unwrap().push(format!("warn: {}", msg));
        }
        fn error(&self, msg: &str) {
            self.lines.lock().unwrap().push(format!("error: {}", msg));
        }
    }

    const APP: &str = r#"
apiVersion: apps/v1
kind: Deployment
metadata:
  name: web
spec:
  template:
    metadata:
      labels:
        app: web
    spec:
      containers:
      - name: web
        env:
        - name: DB
          value: db:5432
---
apiVersion: apps/v1
kind: Deployment
metadata:
  name: db
spec:
  template:
    metadata:
      labels:
        app: db
    spec:
      containers:
      - name: db
---
apiVersion: v1
kind: Service
metadata:
  name: db
spec:
  selector:
    app: db
  ports:
  - port: 5432
"#;

    #[test]
    fn test_policies_from_objects() {
        let objects = parse_yaml(APP).objects;
        let mut analyzer = Analyzer::default();
        let policies = analyzer.policies_from_objects(&objects).unwrap();
        let names: Vec<_> = policies.iter().map(|p| p.name()).collect();
        assert_eq!(names, vec!["db-netpol", "web-netpol", "default-deny-in-namespace"]);
        assert!(analyzer.errors().is_empty());
    }

    #[test]
    fn test_connections_from_objects() {
        let objects = parse_yaml(APP).objects;
        let mut analyzer = Analyzer::default();
        let connections = analyzer.connections_from_objects(&objects).unwrap();
        assert_eq!(connections.len(), 1);
        assert_eq!(connections[0].source.as_ref().unwrap().name, "web");
    }

    #[test]
    fn test_no_relevant_resources_is_fatal() {
        let objects = parse_yaml("apiVersion: v1\nkind: ConfigMap\nmetadata:\n  name: cfg\n").objects;
        let logger = RecordingLogger::default();
        let mut analyzer = Analyzer::new(AnalyzerOptions::new().with_logger(logger.clone()));

        let err = analyzer.policies_from_objects(&objects).unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::NoRelevantResourcesFound);
        assert_eq!(analyzer.errors().len(), 1);
        assert!(analyzer.errors()[0].is_fatal());
        assert!(analyzer.errors()[0].is_severe());
        assert!(
            logger
                .lines
                .lock()
                .unwrap()
                .iter()
                .any(|l| l.starts_with("error: "))
        );
    }

    #[test]
    fn test_fail_fast_stops_on_severe_error() {
        let walker = |root: &Path| -> Vec<Result<PathBuf, WalkError>> {
            vec![Err(WalkError {
                path: root.join("locked"),
                depth: 1,
                message: "permission denied".to_string(),
            })]
        };

        let mut lenient = Analyzer::new(AnalyzerOptions::new().with_walker(walker));
        let err = lenient.policies_from_folder_paths(&["/virtual"]).unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::NoRelevantResourcesFound);
        assert_eq!(lenient.errors().len(), 3);

        let mut strict = Analyzer::new(
            AnalyzerOptions::new()
                .with_walker(walker)
                .with_fail_fast(true),
        );
        let err = strict.policies_from_folder_paths(&["/virtual"]).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::FailedAccessingDir(_)));
        assert_eq!(strict.errors().len(), 1);
    }

    #[test]
    fn test_url_with_default_port_narrows_policy() {
        let manifests = r#"
apiVersion: apps/v1
kind: Deployment
metadata:
  name: web
spec:
  template:
    metadata:
      labels:
        app: web
    spec:
      containers:
      - name: web
        env:
        - name: API_URL
          value: http://api:80/v1
---
apiVersion: apps/v1
kind: Deployment
metadata:
  name: api
spec:
  template:
    metadata:
      labels:
        app: api
    spec:
      containers:
      - name: api
---
apiVersion: v1
kind: Service
metadata:
  name: api
spec:
  selector:
    app: api
  ports:
  - name: http
    port: 80
  - name: admin
    port: 9090
"#;
        let objects = parse_yaml(manifests).objects;
        let mut analyzer = Analyzer::default();
        let policies = analyzer.policies_from_objects(&objects).unwrap();

        let api = policies.iter().find(|p| p.name() == "api-netpol").unwrap();
        let ports: Vec<_> = api.spec.ingress[0]
            .ports
            .iter()
            .map(|p| p.port.clone())
            .collect();
        assert_eq!(ports, vec![Some(IntOrString::Int(80))]);
    }

    #[test]
    fn test_errors_reset_between_runs() {
        let mut analyzer = Analyzer::default();
        assert!(analyzer.policies_from_objects(&[]).is_err());
        assert_eq!(analyzer.errors().len(), 1);

        let objects = parse_yaml(APP).objects;
        assert!(analyzer.policies_from_objects(&objects).is_ok());
        assert!(analyzer.errors().is_empty());
    }
}
