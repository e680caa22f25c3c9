// crates/wf_config/src/basin.rs

//! BasinConfig - 流域部署配置
//!
//! 描述辅助数据文件的相对布局、模型作业参数以及本地存储位置。
//! 所有相对路径都以 `base_path` 为根解析。

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::ConfigError;

/// 模型支持的最早年份
pub const MODEL_FIRST_YEAR: i32 = 1916;
/// 模型支持的最晚年份
pub const MODEL_LAST_YEAR: i32 = 2011;

/// 流域部署配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BasinConfig {
    /// 模型数据根目录
    #[serde(default = "default_base_path")]
    pub base_path: PathBuf,

    /// 辅助文件布局
    #[serde(default)]
    pub layout: LayoutConfig,

    /// 模型作业配置
    #[serde(default)]
    pub job: JobConfig,

    /// 本地存储配置
    #[serde(default)]
    pub storage: StorageConfig,
}

fn default_base_path() -> PathBuf { PathBuf::from(".") }

/// 辅助文件布局（相对 `base_path`）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayoutConfig {
    /// 流向表 (next_x, next_y)
    #[serde(default = "default_flow_direction")]
    pub flow_direction: PathBuf,

    /// 水库坐标表 (lon, lat)
    #[serde(default = "default_reservoirs")]
    pub reservoirs: PathBuf,

    /// 细网格经纬度表 (lon, lat)
    #[serde(default = "default_lonlat")]
    pub lonlat: PathBuf,

    /// 日期表 (year, month, day, ...)
    #[serde(default = "default_dates")]
    pub dates: PathBuf,

    /// 湿地位置表 (lat, lon)
    #[serde(default = "default_wetland_locations")]
    pub wetland_locations: PathBuf,

    /// 湿地位置表中作为参考湿地的行号（从 0 开始）
    #[serde(default = "default_reference_wetland_row")]
    pub reference_wetland_row: usize,

    /// 河道高度栅格（仅用于确定记录数）
    #[serde(default = "default_river_height")]
    pub river_height: PathBuf,

    /// 河道糙率栅格（输出）
    #[serde(default = "default_river_roughness")]
    pub river_roughness: PathBuf,

    /// 洪泛区糙率栅格（输出）
    #[serde(default = "default_flood_roughness")]
    pub flood_roughness: PathBuf,

    /// 原始洪泛区高程栅格（只读）
    #[serde(default = "default_flood_height_original")]
    pub flood_height_original: PathBuf,

    /// 洪泛区高程栅格（输出）
    #[serde(default = "default_flood_height")]
    pub flood_height: PathBuf,

    /// 按日径流栅格路径模板，`{date}` 替换为 YYYYMMDD
    #[serde(default = "default_runoff_template")]
    pub runoff_template: String,

    /// 模型输出目录
    #[serde(default = "default_model_output_dir")]
    pub model_output_dir: PathBuf,
}

fn default_flow_direction() -> PathBuf { PathBuf::from("res/nextxy.txt") }
fn default_reservoirs() -> PathBuf { PathBuf::from("res/reservoir_xy.txt") }
fn default_lonlat() -> PathBuf { PathBuf::from("map/lonlat") }
fn default_dates() -> PathBuf { PathBuf::from("inp/dates_1915_2011") }
fn default_wetland_locations() -> PathBuf { PathBuf::from("map/wetland_loc_multiple") }
fn default_reference_wetland_row() -> usize { 3 }
fn default_river_height() -> PathBuf { PathBuf::from("map/rivhgt.bin") }
fn default_river_roughness() -> PathBuf { PathBuf::from("map/rivman.bin") }
fn default_flood_roughness() -> PathBuf { PathBuf::from("map/fldman.bin") }
fn default_flood_height_original() -> PathBuf { PathBuf::from("map/fldhgt_original.bin") }
fn default_flood_height() -> PathBuf { PathBuf::from("map/fldhgt.bin") }
fn default_runoff_template() -> String { "inp/runoff/roff_{date}.bin".to_string() }
fn default_model_output_dir() -> PathBuf { PathBuf::from("out") }

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            flow_direction: default_flow_direction(),
            reservoirs: default_reservoirs(),
            lonlat: default_lonlat(),
            dates: default_dates(),
            wetland_locations: default_wetland_locations(),
            reference_wetland_row: default_reference_wetland_row(),
            river_height: default_river_height(),
            river_roughness: default_river_roughness(),
            flood_roughness: default_flood_roughness(),
            flood_height_original: default_flood_height_original(),
            flood_height: default_flood_height(),
            runoff_template: default_runoff_template(),
            model_output_dir: default_model_output_dir(),
        }
    }
}

/// 模型作业配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobConfig {
    /// 启动脚本目录（相对 `base_path`）
    #[serde(default = "default_scripts_dir")]
    pub scripts_dir: PathBuf,

    /// 脚本模板文件名，`{model}` 替换为 pre / post
    #[serde(default = "default_template_name")]
    pub template_name: String,

    /// 渲染后的脚本文件名，`{model}` 替换为 pre / post
    #[serde(default = "default_script_name")]
    pub script_name: String,

    /// 启动器程序
    #[serde(default = "default_launcher")]
    pub launcher: String,

    /// 启动器前置参数（位于脚本路径之前）
    #[serde(default)]
    pub launcher_args: Vec<String>,

    /// 支持的最早年份
    #[serde(default = "default_first_year")]
    pub first_year: i32,

    /// 支持的最晚年份
    #[serde(default = "default_last_year")]
    pub last_year: i32,
}

fn default_scripts_dir() -> PathBuf { PathBuf::from("gosh") }
fn default_template_name() -> String { "{model}_template.sh".to_string() }
fn default_script_name() -> String { "{model}.sh".to_string() }
fn default_launcher() -> String { "sh".to_string() }
fn default_first_year() -> i32 { MODEL_FIRST_YEAR }
fn default_last_year() -> i32 { MODEL_LAST_YEAR }

impl Default for JobConfig {
    fn default() -> Self {
        Self {
            scripts_dir: default_scripts_dir(),
            template_name: default_template_name(),
            script_name: default_script_name(),
            launcher: default_launcher(),
            launcher_args: Vec::new(),
            first_year: default_first_year(),
            last_year: default_last_year(),
        }
    }
}

impl JobConfig {
    /// 将年份区间夹到模型支持范围内
    ///
    /// 两端各自夹到 `first_year..=last_year`，有序的输入区间夹后仍然有序。
    pub fn clamp_years(&self, start: i32, end: i32) -> (i32, i32) {
        let clamp = |year: i32| year.max(self.first_year).min(self.last_year);
        (clamp(start), clamp(end))
    }
}

/// 本地存储配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// 作业记录目录（相对 `base_path`）
    #[serde(default = "default_jobs_dir")]
    pub jobs_dir: PathBuf,

    /// 制品存储根目录（相对 `base_path`）
    #[serde(default = "default_artifacts_root")]
    pub artifacts_root: PathBuf,

    /// 临时工作区根目录，缺省时使用系统临时目录
    #[serde(default)]
    pub workspace_root: Option<PathBuf>,
}

fn default_jobs_dir() -> PathBuf { PathBuf::from("state/jobs") }
fn default_artifacts_root() -> PathBuf { PathBuf::from("state/artifacts") }

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            jobs_dir: default_jobs_dir(),
            artifacts_root: default_artifacts_root(),
            workspace_root: None,
        }
    }
}

impl Default for BasinConfig {
    fn default() -> Self {
        Self {
            base_path: default_base_path(),
            layout: LayoutConfig::default(),
            job: JobConfig::default(),
            storage: StorageConfig::default(),
        }
    }
}

impl BasinConfig {
    /// 以指定根目录创建默认配置
    pub fn with_base_path(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
            ..Default::default()
        }
    }

    /// 从文件加载配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigError::io(path, e))?;

        let config: BasinConfig =
            serde_json::from_str(&content).map_err(|e| ConfigError::Parse {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;

        config.validate()?;
        Ok(config)
    }

    /// 验证配置有效性
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.job.first_year > self.job.last_year {
            return Err(ConfigError::YearRange {
                first: self.job.first_year,
                last: self.job.last_year,
            });
        }

        if !self.layout.runoff_template.contains("{date}") {
            return Err(ConfigError::MissingPlaceholder {
                key: "layout.runoff_template".to_string(),
                template: self.layout.runoff_template.clone(),
                placeholder: "{date}",
            });
        }

        if self.job.launcher.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "job.launcher".to_string(),
                value: self.job.launcher.clone(),
                reason: "启动器不能为空".to_string(),
            });
        }

        Ok(())
    }

    /// 保存配置到文件
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| ConfigError::Serialize(e.to_string()))?;
        std::fs::write(path, content).map_err(|e| ConfigError::io(path, e))?;
        Ok(())
    }

    /// 以 `base_path` 解析相对路径，绝对路径原样返回
    pub fn resolve(&self, relative: impl AsRef<Path>) -> PathBuf {
        let relative = relative.as_ref();
        if relative.is_absolute() {
            relative.to_path_buf()
        } else {
            self.base_path.join(relative)
        }
    }

    /// 某一天的径流栅格路径
    pub fn runoff_path(&self, yyyymmdd: &str) -> PathBuf {
        self.resolve(self.layout.runoff_template.replace("{date}", yyyymmdd))
    }

    /// 模型脚本模板路径
    pub fn template_path(&self, model: &str) -> PathBuf {
        self.resolve(&self.job.scripts_dir)
            .join(self.job.template_name.replace("{model}", model))
    }

    /// 渲染后的模型脚本路径
    pub fn script_path(&self, model: &str) -> PathBuf {
        self.resolve(&self.job.scripts_dir)
            .join(self.job.script_name.replace("{model}", model))
    }
}
