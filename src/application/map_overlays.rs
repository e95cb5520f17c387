// Map overlay layers rebuilt from the active record set
use crate::domain::dashboard::{BaseMap, MapView, Marker, OverlayView};
use crate::domain::heading::{LegendEntry, heading_color, heading_legend};
use crate::domain::record::Record;

const STOP_MARKER_COLOR: &str = "blue";

pub const BASE_MAPS: [BaseMap; 3] = [
    BaseMap {
        name: "OpenStreetMap",
        url: "https://{s}.tile.openstreetmap.org/{z}/{x}/{y}.png",
        max_zoom: 20,
    },
    BaseMap {
        name: "Imagery",
        url: "https://server.arcgisonline.com/ArcGIS/rest/services/World_Imagery/MapServer/tile/{z}/{y}/{x}",
        max_zoom: 18,
    },
    BaseMap {
        name: "Dark Gray Canvas",
        url: "https://server.arcgisonline.com/ArcGIS/rest/services/Canvas/World_Dark_Gray_Base/MapServer/tile/{z}/{y}/{x}",
        max_zoom: 18,
    },
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlayKind {
    Heatmap,
    HeadingPoints,
    StopClusters,
}

impl OverlayKind {
    pub const ALL: [OverlayKind; 3] = [
        OverlayKind::Heatmap,
        OverlayKind::HeadingPoints,
        OverlayKind::StopClusters,
    ];

    pub fn name(self) -> &'static str {
        match self {
            OverlayKind::Heatmap => "heatmap",
            OverlayKind::HeadingPoints => "heading_points",
            OverlayKind::StopClusters => "stop_clusters",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            OverlayKind::Heatmap => "Heatmap",
            OverlayKind::HeadingPoints => "Point Layer (Heading Range)",
            OverlayKind::StopClusters => "Cluster Layer (Speed ≤ 0)",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.name() == name)
    }

    fn build(self, records: &[&Record]) -> Vec<Marker> {
        match self {
            OverlayKind::Heatmap => records
                .iter()
                .map(|r| Marker {
                    latitude: r.latitude,
                    longitude: r.longitude,
                    color: None,
                    intensity: Some(1.0),
                })
                .collect(),
            OverlayKind::HeadingPoints => records
                .iter()
                .map(|r| Marker {
                    latitude: r.latitude,
                    longitude: r.longitude,
                    color: Some(heading_color(r.heading)),
                    intensity: None,
                })
                .collect(),
            OverlayKind::StopClusters => records
                .iter()
                .filter(|r| r.is_stopped())
                .map(|r| Marker {
                    latitude: r.latitude,
                    longitude: r.longitude,
                    color: Some(STOP_MARKER_COLOR),
                    intensity: None,
                })
                .collect(),
        }
    }
}

#[derive(Debug)]
struct OverlayLayer {
    kind: OverlayKind,
    visible: bool,
    markers: Vec<Marker>,
    rebuilds: usize,
}

impl OverlayLayer {
    fn rebuild(&mut self, records: &[&Record]) {
        self.markers = self.kind.build(records);
        self.rebuilds += 1;
        tracing::debug!(layer = self.kind.name(), markers = self.markers.len(), "overlay rebuilt");
    }
}

/// The three overlays. Hidden layers hold no markers and are only rebuilt
/// once they are switched on.
#[derive(Debug)]
pub struct MapOverlays {
    center: [f64; 2],
    zoom: u8,
    layers: Vec<OverlayLayer>,
}

impl MapOverlays {
    pub fn new(center: [f64; 2], zoom: u8, visible: &[OverlayKind]) -> Self {
        let layers = OverlayKind::ALL
            .into_iter()
            .map(|kind| OverlayLayer {
                kind,
                visible: visible.contains(&kind),
                markers: Vec::new(),
                rebuilds: 0,
            })
            .collect();
        Self { center, zoom, layers }
    }

    /// Filter changed: rebuild whatever is on screen.
    pub fn refresh(&mut self, active: &[&Record]) {
        for layer in self.layers.iter_mut().filter(|l| l.visible) {
            layer.rebuild(active);
        }
    }

    pub fn set_visible(&mut self, kind: OverlayKind, visible: bool, active: &[&Record]) {
        let layer = self.layer_mut(kind);
        layer.visible = visible;
        if visible {
            layer.rebuild(active);
        } else {
            layer.markers.clear();
        }
    }

    pub fn is_visible(&self, kind: OverlayKind) -> bool {
        self.layer(kind).visible
    }

    #[cfg(test)]
    pub fn markers(&self, kind: OverlayKind) -> &[Marker] {
        &self.layer(kind).markers
    }

    #[cfg(test)]
    pub fn rebuilds(&self, kind: OverlayKind) -> usize {
        self.layer(kind).rebuilds
    }

    /// Shown only while the heading layer is.
    pub fn legend(&self) -> Option<Vec<LegendEntry>> {
        self.is_visible(OverlayKind::HeadingPoints).then(heading_legend)
    }

    pub fn view(&self) -> MapView {
        MapView {
            center: self.center,
            zoom: self.zoom,
            base_maps: BASE_MAPS.to_vec(),
            overlays: self
                .layers
                .iter()
                .map(|l| OverlayView {
                    name: l.kind.name(),
                    title: l.kind.title(),
                    visible: l.visible,
                    markers: l.markers.clone(),
                    revision: l.rebuilds,
                })
                .collect(),
            legend: self.legend(),
        }
    }

    // Layers are built from OverlayKind::ALL, so every kind has a slot.
    fn layer(&self, kind: OverlayKind) -> &OverlayLayer {
        &self.layers[kind as usize]
    }

    fn layer_mut(&mut self, kind: OverlayKind) -> &mut OverlayLayer {
        &mut self.layers[kind as usize]
    }
}
