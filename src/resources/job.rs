use crate::{
    crds::{App, DatabaseMember},
    error::{Error, Result},
    reconciler::Context,
    resources::labels,
    utils,
};
use k8s_openapi::api::{
    batch::v1::{Job, JobSpec},
    core::v1::{Container, PodSpec, PodTemplateSpec},
};
use kube::{
    api::{Api, PostParams},
    Resource,
};
use tracing::info;

/// One-shot schema init job for a database member. Waits for the database
/// endpoint to accept connections, then runs the declared DDL once.
pub fn build_init_job(app: &App, member: &DatabaseMember, resource_name: &str) -> Job {
    let host = resource_name; // Service name = DB hostname
    let user = member.credentials.get("user").map(String::as_str).unwrap_or_default();
    let password = member
        .credentials
        .get("password")
        .map(String::as_str)
        .unwrap_or_default();
    let dbname = member
        .credentials
        .get("dbname")
        .map(String::as_str)
        .unwrap_or_default();

    let psql_cmd = format!(
        r#"until pg_isready -h {host} -p {port} -U {user}; do echo "waiting for db..."; sleep 2; done; PGPASSWORD={password} psql -h {host} -p {port} -U {user} -d {dbname} -c '{sql}'"#,
        host = host,
        port = member.port,
        user = user,
        password = password,
        dbname = dbname,
        sql = member.init_sql,
    );

    Job {
        metadata: kube::api::ObjectMeta {
            name: Some(utils::init_job_name(resource_name)),
            namespace: app.metadata.namespace.clone(),
            labels: Some(labels::database_labels(app, member)),
            owner_references: Some(vec![app.controller_owner_ref(&()).unwrap()]),
            ..Default::default()
        },
        spec: Some(JobSpec {
            backoff_limit: Some(3),
            template: PodTemplateSpec {
                metadata: None,
                spec: Some(PodSpec {
                    restart_policy: Some("OnFailure".to_string()),
                    containers: vec![Container {
                        name: "init-schema".to_string(),
                        image: Some("postgres:16-alpine".to_string()),
                        command: Some(vec!["sh".to_string(), "-c".to_string(), psql_cmd]),
                        ..Default::default()
                    }],
                    ..Default::default()
                }),
            },
            ..Default::default()
        }),
        ..Default::default()
    }
}

/// Create the init job if it does not exist yet. An existing job is left
/// alone even when the declared DDL has changed since: schema initialization
/// runs at most once per database member.
pub async fn ensure(
    app: &App,
    member: &DatabaseMember,
    resource_name: &str,
    namespace: &str,
    ctx: &Context,
) -> Result<()> {
    let api: Api<Job> = Api::namespaced(ctx.client.clone(), namespace);
    let job_name = utils::init_job_name(resource_name);

    match api.get(&job_name).await {
        Ok(_) => Ok(()),
        Err(kube::Error::Api(ae)) if ae.code == 404 => {
            info!("Creating schema init Job {}", job_name);
            let job = build_init_job(app, member, resource_name);
            match api.create(&PostParams::default(), &job).await {
                Ok(_) => Ok(()),
                // lost a creation race; the job exists, which is all we need
                Err(kube::Error::Api(ae)) if ae.code == 409 => Ok(()),
                Err(kube::Error::Api(ae)) => Err(Error::Apply {
                    kind: "Job",
                    name: job_name,
                    reason: ae.message,
                }),
                Err(e) => Err(e.into()),
            }
        }
        Err(e) => Err(e.into()),
    }
}
