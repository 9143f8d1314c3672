//! 仿真模型描述
//!
//! 读取 SDF 模型文件，并按需改写位姿和碰撞 / 可视化尺寸

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use tokio::fs;
use tracing::debug;

use crate::error::{EnvError, EnvResult, ModelError};
use crate::models::sdf;

/// (x, y, z)
pub type Vec3 = (f64, f64, f64);

/// 三维位姿：位置 (x, y, z) + 欧拉角 (x, y, z)
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Pose {
    pub position: Vec3,
    pub orientation: Vec3,
}

impl Pose {
    pub fn new(position: Vec3, orientation: Vec3) -> Self {
        Self {
            position,
            orientation,
        }
    }

    /// SDF 格式 `"x y z roll pitch yaw"`
    pub fn to_sdf_text(&self) -> String {
        format!(
            "{} {}",
            vec3_text(self.position),
            vec3_text(self.orientation)
        )
    }
}

fn vec3_text(v: Vec3) -> String {
    format!("{:?} {:?} {:?}", v.0, v.1, v.2)
}

/// 基本几何类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GeometryType {
    #[default]
    Box,
    Sphere,
    Cylinder,
}

impl GeometryType {
    /// SDF 中的元素名
    pub fn tag(self) -> &'static str {
        match self {
            GeometryType::Box => "box",
            GeometryType::Sphere => "sphere",
            GeometryType::Cylinder => "cylinder",
        }
    }
}

impl FromStr for GeometryType {
    type Err = EnvError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "box" => Ok(GeometryType::Box),
            "sphere" => Ok(GeometryType::Sphere),
            "cylinder" => Ok(GeometryType::Cylinder),
            other => Err(EnvError::Other(format!("未知的几何类型: {}", other))),
        }
    }
}

impl fmt::Display for GeometryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// 仿真模型：可输出最终 SDF 文本
pub trait SimulationModel {
    fn description(&self) -> &ModelDescription;

    /// 返回改写参数后的 SDF，原始描述不变
    fn set_model_parameters(&self) -> EnvResult<String> {
        Ok(self.description().sdf().to_string())
    }

    fn as_string(&self) -> EnvResult<String> {
        self.set_model_parameters()
    }
}

/// SDF 格式的模型描述
#[derive(Debug, Clone, PartialEq)]
pub struct ModelDescription {
    pub name: String,
    pub pose: Pose,
    pub collision_size: Vec3,
    pub visual_size: Vec3,
    sdf: String,
}

impl ModelDescription {
    /// 从 SDF 文件加载模型描述
    ///
    /// # 参数
    /// - `name`: 模型名称
    /// - `sdf_path`: SDF 文件路径
    /// - `pose`: 位姿，默认全 0
    /// - `collision_size`: 碰撞模型尺寸，默认全 0
    /// - `visual_size`: 可视化模型尺寸，默认全 0
    pub async fn load(
        name: impl Into<String>,
        sdf_path: &Path,
        pose: Option<Pose>,
        collision_size: Option<Vec3>,
        visual_size: Option<Vec3>,
    ) -> EnvResult<Self> {
        if !sdf_path.is_file() {
            return Err(EnvError::Model(ModelError::NotFound {
                path: sdf_path.display().to_string(),
            }));
        }

        let sdf = fs::read_to_string(sdf_path).await.map_err(|e| {
            EnvError::Model(ModelError::ReadFailed {
                path: sdf_path.display().to_string(),
                source: e,
            })
        })?;
        debug!("已加载模型 SDF: {}", sdf_path.display());

        Self::from_sdf(name, sdf, pose, collision_size, visual_size)
    }

    /// 从 SDF 文本创建模型描述
    pub fn from_sdf(
        name: impl Into<String>,
        sdf: impl Into<String>,
        pose: Option<Pose>,
        collision_size: Option<Vec3>,
        visual_size: Option<Vec3>,
    ) -> EnvResult<Self> {
        let sdf = sdf.into();
        if sdf::root_element(&sdf)?.is_none() {
            return Err(EnvError::element_not_found("<root>"));
        }
        Ok(Self {
            name: name.into(),
            pose: pose.unwrap_or_default(),
            collision_size: collision_size.unwrap_or_default(),
            visual_size: visual_size.unwrap_or_default(),
            sdf,
        })
    }

    /// 原始 SDF 文本
    pub fn sdf(&self) -> &str {
        &self.sdf
    }
}

impl SimulationModel for ModelDescription {
    fn description(&self) -> &ModelDescription {
        self
    }
}

/// 基本几何体模型（box / sphere / cylinder），只含一个 link
#[derive(Debug, Clone, PartialEq)]
pub struct PrimitiveModel {
    pub description: ModelDescription,
    pub geometry: GeometryType,
}

impl PrimitiveModel {
    pub fn new(description: ModelDescription, geometry: GeometryType) -> Self {
        Self {
            description,
            geometry,
        }
    }

    /// 从 SDF 文件加载基本几何体模型
    pub async fn load(
        name: impl Into<String>,
        sdf_path: &Path,
        geometry: GeometryType,
        pose: Option<Pose>,
        collision_size: Option<Vec3>,
        visual_size: Option<Vec3>,
    ) -> EnvResult<Self> {
        let description =
            ModelDescription::load(name, sdf_path, pose, collision_size, visual_size).await?;
        Ok(Self::new(description, geometry))
    }
}

impl SimulationModel for PrimitiveModel {
    fn description(&self) -> &ModelDescription {
        &self.description
    }

    /// 改写 model/pose 以及 collision、visual 的几何尺寸
    fn set_model_parameters(&self) -> EnvResult<String> {
        let xml = self.description.sdf();
        let root = sdf::root_element(xml)?.ok_or_else(|| EnvError::element_not_found("<root>"))?;
        let geometry = self.geometry.tag();

        let pose = sdf::find_path(xml, root, &["model", "pose"])?;
        let collision_size = sdf::find_path(
            xml,
            root,
            &["model", "link", "collision", "geometry", geometry, "size"],
        )?;
        let visual_size = sdf::find_path(
            xml,
            root,
            &["model", "link", "visual", "geometry", geometry, "size"],
        )?;

        Ok(sdf::replace_contents(
            xml,
            vec![
                (pose, self.description.pose.to_sdf_text()),
                (collision_size, vec3_text(self.description.collision_size)),
                (visual_size, vec3_text(self.description.visual_size)),
            ],
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BOX_SDF: &str = r#"<?xml version="1.0"?>
<sdf version="1.6">
  <model name="box">
    <pose>0 0 0 0 0 0</pose>
    <link name="link">
      <collision name="collision">
        <geometry><box><size>1 1 1</size></box></geometry>
      </collision>
      <visual name="visual">
        <geometry><box><size>1 1 1</size></box></geometry>
      </visual>
    </link>
  </model>
</sdf>"#;

    #[test]
    fn defaults_are_zero() {
        let model = ModelDescription::from_sdf("box", BOX_SDF, None, None, None).unwrap();
        assert_eq!(model.pose, Pose::default());
        assert_eq!(model.collision_size, (0.0, 0.0, 0.0));
        assert_eq!(model.visual_size, (0.0, 0.0, 0.0));
    }

    #[test]
    fn plain_description_is_unchanged() {
        let model = ModelDescription::from_sdf("box", BOX_SDF, None, None, None).unwrap();
        assert_eq!(model.as_string().unwrap(), BOX_SDF);
    }

    #[test]
    fn primitive_model_rewrites_pose_and_sizes() {
        let description = ModelDescription::from_sdf(
            "obstacle",
            BOX_SDF,
            Some(Pose::new((1.0, 2.0, 0.5), (0.0, 0.0, 1.57))),
            Some((0.5, 0.5, 1.0)),
            Some((0.6, 0.6, 1.1)),
        )
        .unwrap();
        let model = PrimitiveModel::new(description, GeometryType::Box);

        let sdf = model.as_string().unwrap();
        assert!(sdf.contains("<pose>1.0 2.0 0.5 0.0 0.0 1.57</pose>"));
        assert!(sdf.contains("<collision name=\"collision\">\n        <geometry><box><size>0.5 0.5 1.0</size>"));
        assert!(sdf.contains("<visual name=\"visual\">\n        <geometry><box><size>0.6 0.6 1.1</size>"));
        // 原始描述不变
        assert_eq!(model.description.sdf(), BOX_SDF);
    }

    #[test]
    fn primitive_model_fills_empty_elements() {
        let sdf = r#"<sdf version="1.6"><model name="box"><pose/><link name="link">
<collision name="collision"><geometry><box><size/></box></geometry></collision>
<visual name="visual"><geometry><box><size/></box></geometry></visual>
</link></model></sdf>"#;
        let description = ModelDescription::from_sdf(
            "obstacle",
            sdf,
            Some(Pose::new((1.0, 2.0, 3.0), (0.0, 0.0, 0.0))),
            Some((0.5, 0.5, 0.5)),
            Some((0.6, 0.6, 0.6)),
        )
        .unwrap();
        let model = PrimitiveModel::new(description, GeometryType::Box);

        let out = model.as_string().unwrap();
        assert!(!out.contains("<pose/>"));
        assert!(!out.contains("<size/>"));
        assert!(out.contains("<pose>1.0 2.0 3.0 0.0 0.0 0.0</pose>"));
        assert!(out.contains("<collision name=\"collision\"><geometry><box><size>0.5 0.5 0.5</size>"));
        assert!(out.contains("<visual name=\"visual\"><geometry><box><size>0.6 0.6 0.6</size>"));
    }

    #[test]
    fn wrong_geometry_type_is_model_error() {
        let description = ModelDescription::from_sdf("box", BOX_SDF, None, None, None).unwrap();
        let model = PrimitiveModel::new(description, GeometryType::Cylinder);
        let err = model.as_string().unwrap_err();
        assert!(matches!(err, EnvError::Model(ModelError::ElementNotFound { .. })));
    }

    #[test]
    fn geometry_type_parses() {
        assert_eq!("sphere".parse::<GeometryType>().unwrap(), GeometryType::Sphere);
        assert!("cone".parse::<GeometryType>().is_err());
    }

    #[tokio::test]
    async fn missing_sdf_file_is_not_found() {
        let err = ModelDescription::load("x", Path::new("/no/such/model.sdf"), None, None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, EnvError::Model(ModelError::NotFound { .. })));
    }
}
