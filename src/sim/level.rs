use super::{GROUND_TOP_PX, PIPE_WIDTH_PX, SCREEN_HEIGHT_PX};
use crate::snapshot::{ElementBox, LevelInfo};
use std::collections::BTreeMap;

const FLAG_HEIGHT_PX: i32 = 160;
const FLAG_WIDTH_PX: i32 = 4;

pub(super) struct Level {
    pub(super) number: u32,
    pub(super) width: i32,
    /// Walkable spans `[start, end)` in pixels; the gaps between them are pits.
    ground: &'static [(i32, i32)],
    /// Pipes as `(left x, height)` standing on the ground.
    pipes: &'static [(i32, i32)],
    pub(super) flag_x: i32,
}

pub(super) const LEVELS: [Level; 2] = [
    Level {
        number: 1,
        width: 3392,
        ground: &[(0, 608), (672, 1536), (1600, 3392)],
        pipes: &[(896, 32), (1184, 48), (1888, 64), (2400, 48), (2880, 32)],
        flag_x: 3200,
    },
    Level {
        number: 2,
        width: 2560,
        ground: &[(0, 640), (704, 1472), (1552, 2560)],
        pipes: &[(320, 48), (960, 32), (1792, 64)],
        flag_x: 2400,
    },
];

pub(super) fn find(number: u32) -> Option<&'static Level> {
    LEVELS.iter().find(|level| level.number == number)
}

impl Level {
    pub(super) fn info(&self) -> LevelInfo {
        LevelInfo {
            number: self.number,
            start_x: 0,
            end_x: self.width,
        }
    }

    fn ground_boxes(&self) -> impl Iterator<Item = ElementBox> + '_ {
        self.ground.iter().zip(0u32..).map(|(&(start, end), id)| ElementBox {
            id,
            x: start,
            y: GROUND_TOP_PX,
            w: end - start,
            h: SCREEN_HEIGHT_PX - GROUND_TOP_PX,
        })
    }

    fn pipe_boxes(&self) -> impl Iterator<Item = ElementBox> + '_ {
        self.pipes.iter().zip(100u32..).map(|(&(x, height), id)| ElementBox {
            id,
            x,
            y: GROUND_TOP_PX - height,
            w: PIPE_WIDTH_PX,
            h: height,
        })
    }

    /// Everything the player collides with.
    pub(super) fn solids(&self) -> Vec<ElementBox> {
        self.ground_boxes().chain(self.pipe_boxes()).collect()
    }

    pub(super) fn boxes(&self) -> BTreeMap<String, Vec<ElementBox>> {
        let mut boxes = BTreeMap::new();
        boxes.insert("ground".to_string(), self.ground_boxes().collect());
        boxes.insert("pipe".to_string(), self.pipe_boxes().collect());
        boxes.insert(
            "flag".to_string(),
            vec![ElementBox {
                id: 200,
                x: self.flag_x,
                y: GROUND_TOP_PX - FLAG_HEIGHT_PX,
                w: FLAG_WIDTH_PX,
                h: FLAG_HEIGHT_PX,
            }],
        );
        boxes
    }
}
