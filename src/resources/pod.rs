use crate::{
    config::ControllerConfig,
    crds::TestRun,
    resources::{configmap, labels},
    utils,
};
use k8s_openapi::api::core::v1::{
    ConfigMapVolumeSource, Container, EmptyDirVolumeSource, Pod, PodSpec, Volume, VolumeMount,
};
use kube::{Resource, ResourceExt};

/// Mount point for the script volume inside the runner pod
pub const SCRIPT_MOUNT_PATH: &str = "/scripts";

const SCRIPT_VOLUME: &str = "scripts";

/// In-pod path handed to the runner as `--script`. Git-sourced runs point at
/// the declared path within the checkout; everything else uses the
/// conventional inline-script file name.
pub fn script_path(run: &TestRun) -> String {
    if run.spec.script.is_empty() {
        if let Some(git) = &run.spec.git {
            let path = git.path.trim_start_matches('/');
            if !path.is_empty() {
                return format!("{}/{}", SCRIPT_MOUNT_PATH, path);
            }
        }
    }
    format!("{}/{}", SCRIPT_MOUNT_PATH, configmap::SCRIPT_FILE)
}

/// Parse a duration string like "60s", "5m" or "1h30m" into whole seconds
pub fn parse_timeout(timeout_str: &str) -> Option<i64> {
    let mut total_seconds = 0i64;
    let mut current_num = String::new();
    let mut seen_unit = false;

    for ch in timeout_str.chars() {
        if ch.is_ascii_digit() {
            current_num.push(ch);
        } else if !current_num.is_empty() {
            let num: i64 = current_num.parse().ok()?;
            match ch {
                'h' => total_seconds += num * 3600,
                'm' => total_seconds += num * 60,
                's' => total_seconds += num,
                _ => return None,
            }
            seen_unit = true;
            current_num.clear();
        } else {
            return None;
        }
    }

    // trailing digits without a unit, or nothing parsed at all
    if !current_num.is_empty() || !seen_unit {
        return None;
    }

    Some(total_seconds)
}

/// Execution pod for a run. Restart policy is Never; the active deadline is
/// derived from the parsed timeout, and an unparsable timeout leaves the pod
/// without a deadline. Exactly one script-source volume strategy applies:
/// inline script over git fetch over an empty mount.
pub fn build_runner_pod(run: &TestRun, config: &ControllerConfig) -> Pod {
    let run_name = run.name_any();

    let timeout = run
        .spec
        .timeout
        .as_deref()
        .unwrap_or(&config.default_timeout);
    let active_deadline_seconds = parse_timeout(timeout);

    let app_name = if run.spec.app_name.is_empty() {
        "unknown".to_string()
    } else {
        run.spec.app_name.clone()
    };
    let namespace = run.namespace().unwrap_or_default();

    let script_mount = VolumeMount {
        name: SCRIPT_VOLUME.to_string(),
        mount_path: SCRIPT_MOUNT_PATH.to_string(),
        ..Default::default()
    };

    let mut init_containers = None;
    let volume = if !run.spec.script.is_empty() {
        // inline script, mounted from the ConfigMap
        Volume {
            name: SCRIPT_VOLUME.to_string(),
            config_map: Some(ConfigMapVolumeSource {
                name: utils::script_configmap_name(&run_name),
                ..Default::default()
            }),
            ..Default::default()
        }
    } else if let Some(git) = &run.spec.git {
        // fetch-then-mount via an init container
        let mut cmd = format!("git clone {} {}", git.url, SCRIPT_MOUNT_PATH);
        if !git.revision.is_empty() {
            cmd.push_str(&format!(
                " && cd {} && git checkout {}",
                SCRIPT_MOUNT_PATH, git.revision
            ));
        }
        init_containers = Some(vec![Container {
            name: "init-git".to_string(),
            image: Some("alpine/git".to_string()),
            command: Some(vec!["sh".to_string(), "-c".to_string(), cmd]),
            volume_mounts: Some(vec![script_mount.clone()]),
            ..Default::default()
        }]);
        Volume {
            name: SCRIPT_VOLUME.to_string(),
            empty_dir: Some(EmptyDirVolumeSource::default()),
            ..Default::default()
        }
    } else {
        // no script source declared, runner gets an empty mount
        Volume {
            name: SCRIPT_VOLUME.to_string(),
            empty_dir: Some(EmptyDirVolumeSource::default()),
            ..Default::default()
        }
    };

    Pod {
        metadata: kube::api::ObjectMeta {
            name: Some(utils::runner_pod_name(&run_name)),
            namespace: run.metadata.namespace.clone(),
            labels: Some(labels::runner_labels(run)),
            owner_references: Some(vec![run.controller_owner_ref(&()).unwrap()]),
            ..Default::default()
        },
        spec: Some(PodSpec {
            restart_policy: Some("Never".to_string()),
            active_deadline_seconds,
            init_containers,
            containers: vec![Container {
                name: "runner".to_string(),
                image: Some(config.runner_image.clone()),
                image_pull_policy: Some("Never".to_string()),
                args: Some(vec![
                    "--script".to_string(),
                    script_path(run),
                    "--app".to_string(),
                    app_name,
                    "--namespace".to_string(),
                    namespace,
                ]),
                volume_mounts: Some(vec![script_mount]),
                ..Default::default()
            }],
            volumes: Some(vec![volume]),
            ..Default::default()
        }),
        ..Default::default()
    }
}
