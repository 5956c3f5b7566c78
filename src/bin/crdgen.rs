use kube::CustomResourceExt;

fn main() {
    let crds = vec![
        topas_operator::crds::App::crd(),
        topas_operator::crds::TestRun::crd(),
    ];
    print!("{}", serde_yaml::to_string(&crds).unwrap());
}
