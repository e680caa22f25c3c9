// crates/wf_workflow/tests/analysis_session.rs

//! 分析会话：从制品存储暂存栅格并在请求结束后清理

use std::fs::File;
use std::io::{Seek, SeekFrom, Write};
use std::path::Path;
use std::sync::Arc;

use wf_analysis::BasinContext;
use wf_config::BasinConfig;
use wf_grid::{days_in_year, GeoPoint, CELL_COUNT};
use wf_raster::Raster;
use wf_workflow::{
    AnalysisRequest, AnalysisSession, ArtifactError, ArtifactRef, ArtifactStore,
    LocalArtifactStore, WorkflowError, PEAK_FLOW_FIRST_YEAR, PEAK_FLOW_LAST_YEAR,
};

const YEAR: i32 = 2001;
const DAYS: usize = 365;

fn point() -> GeoPoint {
    GeoPoint::new(33.0, -100.0).unwrap()
}

fn write_year(path: &Path, f: impl Fn(usize, usize) -> f32) {
    let mut values = Vec::with_capacity(CELL_COUNT * DAYS);
    for day in 0..DAYS {
        for i in 0..CELL_COUNT {
            values.push(f(day, i));
        }
    }
    Raster::new(values).write(path).unwrap();
}

struct Fixture {
    dir: tempfile::TempDir,
    session: AnalysisSession<LocalArtifactStore>,
    workspace_root: std::path::PathBuf,
}

fn fixture() -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    let mut config = BasinConfig::with_base_path(dir.path());
    config.storage.workspace_root = Some("scratch".into());
    let workspace_root = config.resolve("scratch");

    let artifacts =
        LocalArtifactStore::new(config.resolve(&config.storage.artifacts_root)).unwrap();
    artifacts.create_folder("pre_run").unwrap();
    artifacts.create_folder("post_run").unwrap();

    let cell = point().cell().raster_offset();
    let local = dir.path().join(format!("outflw{YEAR}.bin"));

    // 修复前：目标单元 2.0，第 7 天有一个异常值
    write_year(&local, |day, i| {
        if i == cell && day == 7 {
            150_000.0
        } else {
            2.0
        }
    });
    artifacts.upload_file("pre_run", &local).unwrap();

    // 修复后：目标单元 1.0，第 50..56 天为 0.5
    write_year(&local, |day, i| {
        if i == cell && (50..56).contains(&day) {
            0.5
        } else {
            1.0
        }
    });
    artifacts.upload_file("post_run", &local).unwrap();

    let session = AnalysisSession::new(Arc::new(BasinContext::new(config)), Arc::new(artifacts));
    Fixture {
        dir,
        session,
        workspace_root,
    }
}

fn request() -> AnalysisRequest {
    AnalysisRequest {
        pre: ArtifactRef::new("pre_run", format!("outflw{YEAR}.bin")),
        post: ArtifactRef::new("post_run", format!("outflw{YEAR}.bin")),
        year: YEAR,
        point: point(),
    }
}

fn workspace_is_empty(root: &Path) -> bool {
    match std::fs::read_dir(root) {
        Ok(mut entries) => entries.next().is_none(),
        Err(_) => true,
    }
}

#[test]
fn test_wetland_hydrograph_is_clipped() {
    let f = fixture();
    let h = f.session.wetland_hydrograph(&request()).unwrap();

    assert_eq!(h.cell, point().cell());
    assert_eq!(h.pre.len(), DAYS);
    assert_eq!(h.pre[7], 0.0);
    assert_eq!(h.pre[8], 2.0);
    assert_eq!(h.post[52], 0.5);
    assert!(workspace_is_empty(&f.workspace_root));
}

#[test]
fn test_weekly_delta() {
    let f = fixture();
    let delta = f.session.weekly_delta(&request()).unwrap();
    // 修复后最小周均值 0.5；修复前最小周均值 2.0（第 0 天起）
    assert!((delta - (0.5 - 2.0)).abs() < 1e-9);
    assert!(workspace_is_empty(&f.workspace_root));
}

#[test]
fn test_missing_artifact_cleans_workspace() {
    let f = fixture();
    let mut req = request();
    req.post = ArtifactRef::new("post_run", "outflw1999.bin");

    assert!(matches!(
        f.session.wetland_hydrograph(&req),
        Err(WorkflowError::Artifact(ArtifactError::NotFound(_)))
    ));
    assert!(workspace_is_empty(&f.workspace_root));
    assert!(f.dir.path().join("state").exists());
}

#[test]
fn test_peak_flow_year_unsupported_period() {
    let f = fixture();
    assert_eq!(f.session.peak_flow_year("pre_run", point(), 50).unwrap(), None);
    assert!(!f.workspace_root.exists());
}

#[test]
fn test_peak_flow_year_requires_every_year() {
    let f = fixture();
    // 只有 2001 年的输出，1916 年下载失败
    assert!(matches!(
        f.session.peak_flow_year("pre_run", point(), 10),
        Err(WorkflowError::Artifact(ArtifactError::NotFound(_)))
    ));
    assert!(workspace_is_empty(&f.workspace_root));
}

/// 稀疏年文件：全零，只在目标单元的两天写入值
fn write_sparse_year(path: &Path, year: i32, cell: usize, peak: f32) {
    let days = days_in_year(year) as u64;
    let mut file = File::create(path).unwrap();
    file.set_len(days * CELL_COUNT as u64 * 4).unwrap();
    for (day, value) in [(10u64, peak / 2.0), (200, peak)] {
        let offset = (day * CELL_COUNT as u64 + cell as u64) * 4;
        file.seek(SeekFrom::Start(offset)).unwrap();
        file.write_all(&value.to_le_bytes()).unwrap();
    }
}

fn synthetic_peak(year: i32) -> f32 {
    match year {
        1930 => 45.0,
        1950 => 200.0,
        1980 => 120.0,
        1995 => 60.0,
        _ => (10 + year % 10) as f32,
    }
}

#[test]
fn test_peak_flow_year_over_full_record() {
    let f = fixture();
    let folder = f.dir.path().join("state/artifacts/history");
    std::fs::create_dir_all(&folder).unwrap();
    let cell = point().cell().raster_offset();
    for year in PEAK_FLOW_FIRST_YEAR..=PEAK_FLOW_LAST_YEAR {
        write_sparse_year(
            &folder.join(format!("outflw{year}.bin")),
            year,
            cell,
            synthetic_peak(year),
        );
    }

    // 均值 18.58，标准差 22.53：X_10 ≈ 47.97，X_100 ≈ 89.24
    assert_eq!(
        f.session.peak_flow_year("history", point(), 10).unwrap(),
        Some(1930)
    );
    assert!(workspace_is_empty(&f.workspace_root));
    assert_eq!(
        f.session.peak_flow_year("history", point(), 100).unwrap(),
        Some(1995)
    );
    assert!(workspace_is_empty(&f.workspace_root));
}
