use std::collections::BTreeMap;

use topas_operator::config::ControllerConfig;
use topas_operator::crds::{
    App, AppSpec, DatabaseMember, GitSource, ServiceMember, TestRun, TestRunSpec,
};
use topas_operator::resources::{configmap, deployment, job, pod, service};
use topas_operator::utils;

fn make_app() -> App {
    let mut app = App::new(
        "shop",
        AppSpec {
            services: vec![],
            databases: vec![],
        },
    );
    app.metadata.namespace = Some("test".into());
    app.metadata.uid = Some("app-uid-123".into());
    app
}

fn make_service_member() -> ServiceMember {
    ServiceMember {
        name: "cart".into(),
        image: "registry.local/cart:1.2.3".into(),
        version: "1.2.3".into(),
        replicas: Some(2),
        port: 8080,
        grpc_port: None,
        env_vars: BTreeMap::from([("LOG_LEVEL".to_string(), "debug".to_string())]),
    }
}

fn make_database_member() -> DatabaseMember {
    DatabaseMember {
        name: "orders-db".into(),
        image: "postgres:16-alpine".into(),
        port: 5432,
        credentials: BTreeMap::from([
            ("user".to_string(), "shop".to_string()),
            ("password".to_string(), "hunter2".to_string()),
            ("dbname".to_string(), "orders".to_string()),
        ]),
        init_sql: "CREATE TABLE orders (id serial PRIMARY KEY);".into(),
    }
}

fn make_run(spec: TestRunSpec) -> TestRun {
    let mut run = TestRun::new("smoke-1", spec);
    run.metadata.namespace = Some("test".into());
    run.metadata.uid = Some("run-uid-123".into());
    run
}

fn test_config() -> ControllerConfig {
    ControllerConfig {
        runner_image: "localhost/topas-runner:latest".into(),
        default_timeout: "60s".into(),
    }
}

#[test]
fn test_service_deployment_builder() {
    let app = make_app();
    let member = make_service_member();
    let deploy = deployment::build_service_deployment(&app, &member, "shop-cart");

    assert_eq!(deploy.metadata.name.as_deref(), Some("shop-cart"));
    assert_eq!(deploy.metadata.namespace.as_deref(), Some("test"));

    let owners = deploy.metadata.owner_references.as_ref().unwrap();
    assert_eq!(owners.len(), 1);
    assert_eq!(owners[0].name, "shop");
    assert_eq!(owners[0].kind, "App");
    assert_eq!(owners[0].controller, Some(true));

    let spec = deploy.spec.unwrap();
    assert_eq!(spec.replicas, Some(2));

    let pod_spec = spec.template.spec.unwrap();
    assert_eq!(pod_spec.containers.len(), 1);

    let container = &pod_spec.containers[0];
    assert_eq!(container.name, "cart");
    assert_eq!(container.image.as_deref(), Some("registry.local/cart:1.2.3"));

    // env vars copied verbatim
    let env = container.env.as_ref().unwrap();
    assert!(env
        .iter()
        .any(|e| e.name == "LOG_LEVEL" && e.value.as_deref() == Some("debug")));

    // single unnamed primary port
    let ports = container.ports.as_ref().unwrap();
    assert_eq!(ports.len(), 1);
    assert_eq!(ports[0].container_port, 8080);
    assert_eq!(ports[0].name, None);

    // selector stays free of the version label
    let selector = spec.selector.match_labels.unwrap();
    assert!(!selector.contains_key("app.kubernetes.io/version"));
    assert_eq!(
        selector.get("app.kubernetes.io/part-of").map(String::as_str),
        Some("shop")
    );
}

#[test]
fn test_service_deployment_replicas_default_to_one() {
    let app = make_app();
    let mut member = make_service_member();
    member.replicas = None;
    let deploy = deployment::build_service_deployment(&app, &member, "shop-cart");
    assert_eq!(deploy.spec.unwrap().replicas, Some(1));
}

#[test]
fn test_service_grpc_port_named() {
    let app = make_app();
    let mut member = make_service_member();
    member.grpc_port = Some(9090);

    let deploy = deployment::build_service_deployment(&app, &member, "shop-cart");
    let pod_spec = deploy.spec.unwrap().template.spec.unwrap();
    let ports = pod_spec.containers[0].ports.as_ref().unwrap();
    assert_eq!(ports.len(), 2);
    assert!(ports
        .iter()
        .any(|p| p.container_port == 9090 && p.name.as_deref() == Some("grpc")));

    let svc = service::build_service_endpoint(&app, &member, "shop-cart");
    let svc_ports = svc.spec.unwrap().ports.unwrap();
    assert_eq!(svc_ports.len(), 2);
    assert!(svc_ports
        .iter()
        .any(|p| p.name.as_deref() == Some("http") && p.port == 8080));
    assert!(svc_ports
        .iter()
        .any(|p| p.name.as_deref() == Some("grpc") && p.port == 9090));
}

#[test]
fn test_service_endpoint_primary_port_named_http() {
    let app = make_app();
    let member = make_service_member();
    let svc = service::build_service_endpoint(&app, &member, "shop-cart");
    let svc_ports = svc.spec.unwrap().ports.unwrap();
    assert_eq!(svc_ports.len(), 1);
    assert_eq!(svc_ports[0].name.as_deref(), Some("http"));
}

#[test]
fn test_database_deployment_credentials() {
    let app = make_app();
    let db = make_database_member();
    let deploy = deployment::build_database_deployment(&app, &db, "shop-orders-db");

    let pod_spec = deploy.spec.unwrap().template.spec.unwrap();
    let env = pod_spec.containers[0].env.as_ref().unwrap();
    assert!(env
        .iter()
        .any(|e| e.name == "POSTGRES_USER" && e.value.as_deref() == Some("shop")));
    assert!(env
        .iter()
        .any(|e| e.name == "POSTGRES_PASSWORD" && e.value.as_deref() == Some("hunter2")));
    assert!(env
        .iter()
        .any(|e| e.name == "POSTGRES_DB" && e.value.as_deref() == Some("orders")));
}

#[test]
fn test_database_deployment_missing_credentials_not_injected() {
    let app = make_app();
    let mut db = make_database_member();
    db.credentials.remove("password");
    let deploy = deployment::build_database_deployment(&app, &db, "shop-orders-db");

    let pod_spec = deploy.spec.unwrap().template.spec.unwrap();
    let env = pod_spec.containers[0].env.as_ref().unwrap();
    assert!(!env.iter().any(|e| e.name == "POSTGRES_PASSWORD"));
}

#[test]
fn test_init_job_builder() {
    let app = make_app();
    let db = make_database_member();
    let init = job::build_init_job(&app, &db, "shop-orders-db");

    assert_eq!(init.metadata.name.as_deref(), Some("shop-orders-db-init"));

    let spec = init.spec.unwrap();
    assert_eq!(spec.backoff_limit, Some(3));

    let pod_spec = spec.template.spec.unwrap();
    assert_eq!(pod_spec.restart_policy.as_deref(), Some("OnFailure"));

    let container = &pod_spec.containers[0];
    assert_eq!(container.name, "init-schema");
    assert_eq!(container.image.as_deref(), Some("postgres:16-alpine"));

    let cmd = container.command.as_ref().unwrap().join(" ");
    assert!(cmd.contains("pg_isready -h shop-orders-db -p 5432 -U shop"));
    assert!(cmd.contains("CREATE TABLE orders"));
    assert!(cmd.contains("PGPASSWORD=hunter2"));
}

#[test]
fn test_builders_are_deterministic() {
    let app = make_app();
    let member = make_service_member();
    let db = make_database_member();

    let first = deployment::build_service_deployment(&app, &member, "shop-cart");
    let second = deployment::build_service_deployment(&app, &member, "shop-cart");
    assert_eq!(
        serde_json::to_value(&first).unwrap(),
        serde_json::to_value(&second).unwrap()
    );

    let first = service::build_database_endpoint(&app, &db, "shop-orders-db");
    let second = service::build_database_endpoint(&app, &db, "shop-orders-db");
    assert_eq!(
        serde_json::to_value(&first).unwrap(),
        serde_json::to_value(&second).unwrap()
    );
}

#[test]
fn test_runner_pod_inline_script() {
    let run = make_run(TestRunSpec {
        app_name: "shop".into(),
        script: "sut.get('/healthz')".into(),
        git: None,
        timeout: Some("60s".into()),
    });
    let runner = pod::build_runner_pod(&run, &test_config());

    assert_eq!(runner.metadata.name.as_deref(), Some("smoke-1-runner"));
    let labels = runner.metadata.labels.as_ref().unwrap();
    assert_eq!(labels.get("runner-type").map(String::as_str), Some("topas"));
    assert_eq!(
        labels
            .get("app.kubernetes.io/part-of")
            .map(String::as_str),
        Some("shop")
    );

    let spec = runner.spec.unwrap();
    assert_eq!(spec.restart_policy.as_deref(), Some("Never"));
    assert_eq!(spec.active_deadline_seconds, Some(60));
    assert!(spec.init_containers.is_none());

    // inline script rides in on the ConfigMap volume
    let volumes = spec.volumes.as_ref().unwrap();
    assert_eq!(volumes.len(), 1);
    let cm_source = volumes[0].config_map.as_ref().unwrap();
    assert_eq!(cm_source.name, "smoke-1-script");

    let args = spec.containers[0].args.as_ref().unwrap();
    assert_eq!(
        args,
        &vec![
            "--script".to_string(),
            "/scripts/test.lua".to_string(),
            "--app".to_string(),
            "shop".to_string(),
            "--namespace".to_string(),
            "test".to_string(),
        ]
    );
}

#[test]
fn test_runner_pod_inline_takes_precedence_over_git() {
    let run = make_run(TestRunSpec {
        app_name: "shop".into(),
        script: "sut.get('/healthz')".into(),
        git: Some(GitSource {
            url: "https://example.com/tests.git".into(),
            path: "suites/smoke.lua".into(),
            revision: "main".into(),
        }),
        timeout: Some("60s".into()),
    });
    let runner = pod::build_runner_pod(&run, &test_config());

    let spec = runner.spec.unwrap();
    assert!(spec.init_containers.is_none());
    let volumes = spec.volumes.as_ref().unwrap();
    assert!(volumes[0].config_map.is_some());
    assert!(volumes[0].empty_dir.is_none());
    assert_eq!(pod::script_path(&run), "/scripts/test.lua");
}

#[test]
fn test_runner_pod_git_source() {
    let run = make_run(TestRunSpec {
        app_name: "shop".into(),
        script: String::new(),
        git: Some(GitSource {
            url: "https://example.com/tests.git".into(),
            path: "suites/smoke.lua".into(),
            revision: "v2".into(),
        }),
        timeout: Some("60s".into()),
    });
    let runner = pod::build_runner_pod(&run, &test_config());

    let spec = runner.spec.unwrap();
    let volumes = spec.volumes.as_ref().unwrap();
    assert!(volumes[0].empty_dir.is_some());

    let init = spec.init_containers.as_ref().unwrap();
    assert_eq!(init.len(), 1);
    assert_eq!(init[0].name, "init-git");
    assert_eq!(init[0].image.as_deref(), Some("alpine/git"));
    let cmd = init[0].command.as_ref().unwrap().join(" ");
    assert!(cmd.contains("git clone https://example.com/tests.git /scripts"));
    assert!(cmd.contains("git checkout v2"));

    let args = spec.containers[0].args.as_ref().unwrap();
    assert_eq!(args[1], "/scripts/suites/smoke.lua");
}

#[test]
fn test_runner_pod_no_source_gets_empty_mount() {
    let run = make_run(TestRunSpec {
        app_name: "shop".into(),
        script: String::new(),
        git: None,
        timeout: Some("60s".into()),
    });
    let runner = pod::build_runner_pod(&run, &test_config());

    let spec = runner.spec.unwrap();
    assert!(spec.init_containers.is_none());
    assert!(spec.volumes.as_ref().unwrap()[0].empty_dir.is_some());
}

#[test]
fn test_runner_pod_unparsable_timeout_yields_no_deadline() {
    let run = make_run(TestRunSpec {
        app_name: "shop".into(),
        script: "x".into(),
        git: None,
        timeout: Some("soon".into()),
    });
    let runner = pod::build_runner_pod(&run, &test_config());
    assert_eq!(runner.spec.unwrap().active_deadline_seconds, None);
}

#[test]
fn test_runner_pod_empty_app_name_falls_back() {
    let run = make_run(TestRunSpec {
        app_name: String::new(),
        script: "x".into(),
        git: None,
        timeout: None,
    });
    let runner = pod::build_runner_pod(&run, &test_config());
    let spec = runner.spec.unwrap();
    let args = spec.containers[0].args.as_ref().unwrap();
    assert_eq!(args[3], "unknown");
    // unset timeout falls back to the configured default
    assert_eq!(spec.active_deadline_seconds, Some(60));
}

#[test]
fn test_script_configmap_builder() {
    let run = make_run(TestRunSpec {
        app_name: "shop".into(),
        script: "print('hi')".into(),
        git: None,
        timeout: Some("60s".into()),
    });
    let cm = configmap::build_script_configmap(&run);

    assert_eq!(cm.metadata.name.as_deref(), Some("smoke-1-script"));
    let data = cm.data.unwrap();
    assert_eq!(data.get("test.lua").map(String::as_str), Some("print('hi')"));

    let labels = cm.metadata.labels.unwrap();
    assert_eq!(labels.get("runner-type").map(String::as_str), Some("topas"));
}

#[test]
fn test_derived_names() {
    assert_eq!(utils::member_resource_name("shop", "cart"), "shop-cart");
    assert_eq!(utils::init_job_name("shop-orders-db"), "shop-orders-db-init");
    assert_eq!(utils::script_configmap_name("smoke-1"), "smoke-1-script");
    assert_eq!(utils::runner_pod_name("smoke-1"), "smoke-1-runner");
}
