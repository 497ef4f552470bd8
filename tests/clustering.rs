use std::fs;
use std::path::{Path, PathBuf};
use cdr3_cluster::config::subsystems::{ClusteringPolicy, ClusteringStrategy};
use cdr3_cluster::{run, ClusterConfig, Error};
use tempfile::{tempdir, TempDir};

const HEADER: &str = "sample_id,patient_id,v_call,j_call,junction_aa,consensus_count\n";

fn write_input(dir: &Path, rows: &[(&str, &str, &str, &str, &str, u64)]) -> PathBuf {
    let mut content = HEADER.to_string();
    for (sample, patient, v, j, junction, count) in rows {
        content.push_str(&format!("{},{},{},{},{},{}\n", sample, patient, v, j, junction, count));
    }
    let path = dir.join("records.csv");
    fs::write(&path, content).unwrap();
    path
}

fn config_for(input: PathBuf, dir: &TempDir, policies: Vec<ClusteringPolicy>) -> ClusterConfig {
    let mut config = ClusterConfig::default();
    config.files.input = Some(input);
    config.files.output_dir = dir.path().join("results");
    config.clustering.policies = policies;
    config.processor.thread_count = 2;
    config.processor.show_progress = false;
    config.validate().unwrap();
    config
}

fn summary_lines(config: &ClusterConfig, policy: ClusteringPolicy) -> Vec<String> {
    let path = config.files.output_dir.join(policy.output_dir_name()).join("summary.csv");
    fs::read_to_string(path).unwrap().lines().map(str::to_string).collect()
}

fn toy_rows() -> Vec<(&'static str, &'static str, &'static str, &'static str, &'static str, u64)> {
    vec![
        ("s1", "p1", "IGHV1", "IGHJ4", "AAAA", 10),
        ("s2", "p1", "IGHV1", "IGHJ4", "AAAB", 5),
        ("s3", "p2", "IGHV1", "IGHJ4", "AAAA", 30),
        ("s4", "p3", "IGHV1", "IGHJ4", "CCCC", 1),
    ]
}

#[test]
fn shared_identical_junction_forms_the_only_cluster() {
    let dir = tempdir().unwrap();
    let input = write_input(dir.path(), &toy_rows());
    let config = config_for(input, &dir, ClusteringPolicy::all());

    let runs = run(&config).unwrap();
    assert_eq!(runs.len(), 3);

    for policy in ClusteringPolicy::all() {
        let lines = summary_lines(&config, policy);
        assert_eq!(lines[0], "v_call,j_call,junction_aa,consensus_count,patient_count,patient_id");
        assert_eq!(lines[1..], ["IGHV1,IGHJ4,AAAA,20.0,2,p1_p2".to_string()], "{:?}", policy);

        let cluster_file = config
            .files
            .output_dir
            .join(policy.output_dir_name())
            .join("clusters/2/IGHV1_IGHJ4_AAAA.csv");
        let members = fs::read_to_string(&cluster_file).unwrap();
        assert_eq!(
            members,
            "sample_id,patient_id,v_call,j_call,junction_aa,consensus_count\n\
             s1,p1,IGHV1,IGHJ4,AAAA,10\n\
             s3,p2,IGHV1,IGHJ4,AAAA,30\n"
        );
    }
}

#[test]
fn substitution_matrix_removes_edges_positional_identity_allows() {
    let dir = tempdir().unwrap();
    let input = write_input(dir.path(), &toy_rows());
    let matrix = dir.path().join("matrix.csv");
    fs::write(&matrix, ",A,B,C\nA,4,-1,0\nB,-1,4,0\nC,0,0,9\n").unwrap();

    let mut config = config_for(input, &dir, vec![ClusteringPolicy::Similar, ClusteringPolicy::Convergence]);
    config.clustering.similarity_threshold = 0.7;
    config.files.substitution_matrix = Some(matrix);
    run(&config).unwrap();

    // AAAA/AAAB pass 0.7 positionally, so similar clustering takes all three
    assert_eq!(summary_lines(&config, ClusteringPolicy::Similar)[1], "IGHV1,IGHJ4,AAAA,15.0,2,p1_p2");
    // A/B scores -1, leaving only the identical pair
    assert_eq!(summary_lines(&config, ClusteringPolicy::Convergence)[1], "IGHV1,IGHJ4,AAAA,20.0,2,p1_p2");
}

#[test]
fn exact_clusters_never_span_gene_calls() {
    let dir = tempdir().unwrap();
    let input = write_input(dir.path(), &[
        ("s1", "p1", "IGHV1", "IGHJ4", "CARW", 1),
        ("s2", "p2", "IGHV2", "IGHJ4", "CARW", 1),
        ("s3", "p3", "IGHV1", "IGHJ6", "CARW", 1),
        ("s4", "p4", "IGHV2", "IGHJ4", "CARW", 3),
    ]);
    let config = config_for(input, &dir, vec![ClusteringPolicy::Exact]);
    let runs = run(&config).unwrap();

    let lines = summary_lines(&config, ClusteringPolicy::Exact);
    assert_eq!(lines[1..], ["IGHV2,IGHJ4,CARW,2.0,2,p2_p4".to_string()]);
    let report = runs[0].report.as_ref().unwrap();
    assert_eq!(report.groups_considered, 1);
    assert_eq!(report.clusters_retained, 1);
}

#[test]
fn single_patient_clusters_are_filtered_out() {
    let dir = tempdir().unwrap();
    let input = write_input(dir.path(), &[
        ("s1", "p1", "IGHV1", "IGHJ4", "CARW", 1),
        ("s2", "p1", "IGHV1", "IGHJ4", "CARW", 1),
        ("s3", "p1", "IGHV1", "IGHJ4", "CARF", 1),
    ]);
    let mut config = config_for(input, &dir, vec![ClusteringPolicy::Similar]);
    config.clustering.patient_min = 1;
    run(&config).unwrap();
    // one patient is enough when patient_min is 1
    assert_eq!(summary_lines(&config, ClusteringPolicy::Similar).len(), 2);

    config.clustering.patient_min = 2;
    let runs = run(&config).unwrap();
    assert_eq!(summary_lines(&config, ClusteringPolicy::Similar).len(), 1);
    assert!(runs[0].summary.is_empty());

    // clusters from the earlier run are cleared
    let clusters_dir = config.files.output_dir.join("clustering_similar/clusters");
    assert_eq!(fs::read_dir(clusters_dir).unwrap().count(), 0);
}

#[test]
fn empty_input_yields_header_only_summaries() {
    let dir = tempdir().unwrap();
    let input = write_input(dir.path(), &[]);
    let config = config_for(input, &dir, ClusteringPolicy::all());
    let runs = run(&config).unwrap();

    for policy in ClusteringPolicy::all() {
        assert_eq!(summary_lines(&config, policy).len(), 1);
    }
    assert!(runs.iter().all(|r| r.report.as_ref().unwrap().clusters_found == 0));
}

#[test]
fn existing_summaries_are_kept_when_skipping() {
    let dir = tempdir().unwrap();
    let input = write_input(dir.path(), &toy_rows());
    let mut config = config_for(input, &dir, vec![ClusteringPolicy::Exact]);
    run(&config).unwrap();
    let first = summary_lines(&config, ClusteringPolicy::Exact);

    // the new input has no shared junction
    write_input(dir.path(), &toy_rows()[..2]);
    config.processor.skip_existing = true;
    let runs = run(&config).unwrap();
    assert!(runs[0].skipped);
    assert_eq!(summary_lines(&config, ClusteringPolicy::Exact), first);

    config.processor.skip_existing = false;
    let runs = run(&config).unwrap();
    assert!(!runs[0].skipped);
    assert_eq!(summary_lines(&config, ClusteringPolicy::Exact).len(), 1);
}

#[test]
fn report_describes_the_run() {
    let dir = tempdir().unwrap();
    let input = write_input(dir.path(), &toy_rows());
    let mut config = config_for(input, &dir, vec![ClusteringPolicy::Convergence]);
    config.clustering.strategy = ClusteringStrategy::Streaming;
    run(&config).unwrap();

    let path = config.files.output_dir.join("clustering_convergence/report.json");
    let report: serde_json::Value = serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap();
    assert_eq!(report["policy"], "convergence");
    assert_eq!(report["strategy"], "streaming");
    assert_eq!(report["records"], 4);
    assert_eq!(report["distinct_patients"], 3);
    assert_eq!(report["groups_considered"], 1);
    assert_eq!(report["groups_failed"].as_array().unwrap().len(), 0);
    assert_eq!(report["clusters_retained"], 1);
    assert_eq!(report["parameters"]["patient_min"], 2);
    assert_eq!(report["parameters"]["substitution_matrix"], "BLOSUM62 (built-in)");
}

#[test]
fn malformed_rows_are_dropped_not_fatal() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("records.tsv");
    fs::write(
        &path,
        "patient_id\tsample_id\tv_call\tj_call\tjunction_aa\tconsensus_count\tproductive\n\
         p1\ts1\tIGHV1\tIGHJ4\tCARW\t2\tT\n\
         p2\ts2\tIGHV1\tIGHJ4\tCARW\tNA\tT\n\
         p3\ts3\t\tIGHJ4\tCARW\t2\tT\n\
         p4\ts4\tIGHV1\tIGHJ4\tCARW\t4\tT\n",
    )
    .unwrap();
    let config = config_for(path, &dir, vec![ClusteringPolicy::Exact]);
    let runs = run(&config).unwrap();

    assert_eq!(runs[0].report.as_ref().unwrap().records, 2);
    assert_eq!(summary_lines(&config, ClusteringPolicy::Exact)[1], "IGHV1,IGHJ4,CARW,3.0,2,p1_p4");
}

#[test]
fn ini_file_drives_a_run() {
    let dir = tempdir().unwrap();
    let input = write_input(dir.path(), &toy_rows());
    let output = dir.path().join("from_ini");
    let ini = dir.path().join("cluster.ini");
    fs::write(
        &ini,
        format!(
            "[file]\ninput = {}\noutput_dir = {}\n\n[clustering]\npolicies = similar\n\n[processor]\nthread_count = 1\nshow_progress = false\n",
            input.display(),
            output.display()
        ),
    )
    .unwrap();

    let config = ClusterConfig::from_ini(&ini).unwrap();
    let runs = run(&config).unwrap();
    assert_eq!(runs.len(), 1);
    assert!(output.join("clustering_similar/summary.csv").is_file());
}

#[test]
fn missing_required_column_fails_the_run() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("records.csv");
    fs::write(&path, "sample_id,patient_id,v_call,junction_aa,consensus_count\ns1,p1,IGHV1,CARW,1\n").unwrap();
    let config = config_for(path, &dir, vec![ClusteringPolicy::Exact]);
    assert!(matches!(run(&config), Err(Error::Input(_))));
}

#[test]
fn slash_and_dash_gene_calls_write_separate_files() {
    let dir = tempdir().unwrap();
    let input = write_input(dir.path(), &[
        ("s1", "p1", "IGHV1/OR15-1", "IGHJ4", "CARW", 1),
        ("s2", "p2", "IGHV1/OR15-1", "IGHJ4", "CARW", 1),
        ("s3", "p3", "IGHV1-OR15-1", "IGHJ4", "CARW", 1),
        ("s4", "p4", "IGHV1-OR15-1", "IGHJ4", "CARW", 1),
    ]);
    let config = config_for(input, &dir, vec![ClusteringPolicy::Exact]);
    run(&config).unwrap();

    let clusters = config.files.output_dir.join("clustering_exact/clusters/2");
    let mut names: Vec<String> = fs::read_dir(&clusters)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    assert_eq!(names, ["IGHV1%2FOR15-1_IGHJ4_CARW.csv", "IGHV1-OR15-1_IGHJ4_CARW.csv"]);
}
